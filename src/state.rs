//! Shared application state

use std::sync::Arc;

use crate::config::{Config, StoreKind};
use crate::core::content_types::TypeRegistry;
use crate::hooks::{self, Hooks, LifecycleEvent};
use crate::middleware::admin_auth::LoginGuard;
use crate::store::{MemoryStore, MetadataStore, SqliteStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetadataStore>,
    pub hooks: Arc<Hooks>,
    pub types: Arc<TypeRegistry>,
    /// Empty disables admin protection and admin detection
    pub admin_token: Arc<str>,
    pub login_guard: Arc<LoginGuard>,
    /// Key admin lockouts by `X-Forwarded-For` instead of the peer address
    pub trust_proxy: bool,
    pub page_size: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn MetadataStore>, config: &Config) -> Self {
        let mut hooks = Hooks::default();
        hooks::register(&mut hooks);

        tracing::debug!(
            render_head = hooks.registered(LifecycleEvent::RenderHead),
            admin_menu = hooks.registered(LifecycleEvent::AdminMenu),
            manage_columns = hooks.registered(LifecycleEvent::ManageColumns),
            enqueue_assets = hooks.registered(LifecycleEvent::EnqueueAssets),
            "Hooks registered"
        );

        Self {
            store,
            hooks: Arc::new(hooks),
            types: Arc::new(TypeRegistry::builtin().with_extra(&config.extra_types)),
            admin_token: Arc::from(config.admin_token.as_str()),
            login_guard: Arc::new(LoginGuard::default()),
            trust_proxy: config.trust_proxy,
            page_size: config.page_size,
        }
    }

    /// Open the configured store and build the state around it
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store: Arc<dyn MetadataStore> = match config.store {
            StoreKind::Memory => {
                tracing::warn!("Using in-memory store, counts are lost on restart");
                Arc::new(MemoryStore::new())
            }
            StoreKind::Sqlite => {
                let store = SqliteStore::open(&config.db_file)?;
                tracing::info!("Opened {}", config.db_file);
                Arc::new(store)
            }
        };
        Ok(Self::new(store, config))
    }

    /// Run blocking store work off the async runtime
    pub async fn with_store<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&dyn MetadataStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || f(store.as_ref())).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Store task failed: {}", e);
                None
            }
        }
    }
}
