mod api;
mod config;
mod core;
mod hooks;
mod middleware;
mod render;
mod state;
mod static_files;
mod store;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::CONFIG;
use crate::hooks::ANALYTICS_PATH;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = match AppState::from_config(&CONFIG) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down");
    };

    let app = api::router(state).layer(api::cors_layer(&CONFIG.cors));

    let addr: SocketAddr = match CONFIG.web_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid address {}: {}", CONFIG.web_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("View counter listening on {}", addr);
    tracing::info!("Analytics dashboard: http://{}{}", addr, ANALYTICS_PATH);
    tracing::info!("Admin API protected: {}", !CONFIG.admin_token.is_empty());
    tracing::info!("Trusting proxy headers: {}", CONFIG.trust_proxy);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}
