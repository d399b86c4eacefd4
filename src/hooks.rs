//! Lifecycle hooks exposed by the host integration
//!
//! The host fires a handful of events; add-ons register plain functions
//! against them. Nothing here keeps global state, the [`Hooks`] table lives in
//! the application state.

use serde::Serialize;

use crate::core::columns::{LISTING_TYPES, VIEWS_COLUMN, VIEWS_COLUMN_TITLE};
use crate::core::count::{record_view, ViewOutcome, ViewRequest};
use crate::store::MetadataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A public page is being rendered
    RenderHead,
    /// The admin menu is being built
    AdminMenu,
    /// An admin listing is collecting its columns
    ManageColumns,
    /// Admin pages are collecting their stylesheets and scripts
    EnqueueAssets,
}

pub type RenderHook = fn(&dyn MetadataStore, &ViewRequest) -> ViewOutcome;
pub type MenuHook = fn(&mut Vec<MenuEntry>);
pub type ColumnsHook = fn(&str, &mut Vec<Column>);
pub type AssetsHook = fn(&mut Vec<Asset>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub page_title: String,
    pub menu_title: String,
    pub capability: String,
    pub slug: String,
    pub icon: String,
    pub position: u32,
    /// Where the page is served
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: String,
    pub title: String,
    pub sortable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Style,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub handle: String,
    pub path: String,
    pub kind: AssetKind,
}

#[derive(Debug, Default, Clone)]
pub struct Hooks {
    render_head: Vec<RenderHook>,
    admin_menu: Vec<MenuHook>,
    manage_columns: Vec<ColumnsHook>,
    enqueue_assets: Vec<AssetsHook>,
}

impl Hooks {
    pub fn on_render_head(&mut self, hook: RenderHook) -> &mut Self {
        self.render_head.push(hook);
        self
    }

    pub fn on_admin_menu(&mut self, hook: MenuHook) -> &mut Self {
        self.admin_menu.push(hook);
        self
    }

    pub fn on_manage_columns(&mut self, hook: ColumnsHook) -> &mut Self {
        self.manage_columns.push(hook);
        self
    }

    pub fn on_enqueue_assets(&mut self, hook: AssetsHook) -> &mut Self {
        self.enqueue_assets.push(hook);
        self
    }

    pub fn registered(&self, event: LifecycleEvent) -> usize {
        match event {
            LifecycleEvent::RenderHead => self.render_head.len(),
            LifecycleEvent::AdminMenu => self.admin_menu.len(),
            LifecycleEvent::ManageColumns => self.manage_columns.len(),
            LifecycleEvent::EnqueueAssets => self.enqueue_assets.len(),
        }
    }

    pub fn render_head(&self, store: &dyn MetadataStore, request: &ViewRequest) -> Vec<ViewOutcome> {
        self.render_head.iter().map(|hook| hook(store, request)).collect()
    }

    pub fn admin_menu(&self) -> Vec<MenuEntry> {
        let mut entries = Vec::new();
        for hook in &self.admin_menu {
            hook(&mut entries);
        }
        entries.sort_by_key(|e| e.position);
        entries
    }

    pub fn columns(&self, content_type: &str) -> Vec<Column> {
        let mut columns = Vec::new();
        for hook in &self.manage_columns {
            hook(content_type, &mut columns);
        }
        columns
    }

    pub fn assets(&self) -> Vec<Asset> {
        let mut assets = Vec::new();
        for hook in &self.enqueue_assets {
            hook(&mut assets);
        }
        assets
    }
}

pub const ANALYTICS_SLUG: &str = "avc-views-analytics";
pub const ANALYTICS_PATH: &str = "/admin/analytics";

fn analytics_menu(entries: &mut Vec<MenuEntry>) {
    entries.push(MenuEntry {
        page_title: "View Analytics".to_string(),
        menu_title: "View Analytics".to_string(),
        capability: "manage_options".to_string(),
        slug: ANALYTICS_SLUG.to_string(),
        icon: "dashicons-chart-line".to_string(),
        position: 20,
        path: ANALYTICS_PATH.to_string(),
    });
}

fn views_column(content_type: &str, columns: &mut Vec<Column>) {
    if LISTING_TYPES.contains(&content_type) {
        columns.push(Column {
            key: VIEWS_COLUMN.to_string(),
            title: VIEWS_COLUMN_TITLE.to_string(),
            sortable: true,
        });
    }
}

fn dashboard_assets(assets: &mut Vec<Asset>) {
    assets.push(Asset {
        handle: "avc-admin-css".to_string(),
        path: "/static/awesome.css".to_string(),
        kind: AssetKind::Style,
    });
    assets.push(Asset {
        handle: "avc-chart".to_string(),
        path: "/static/chart.js".to_string(),
        kind: AssetKind::Script,
    });
}

/// Wire the view counter and the analytics page into the host events
pub fn register(hooks: &mut Hooks) {
    hooks
        .on_render_head(record_view)
        .on_admin_menu(analytics_menu)
        .on_manage_columns(views_column)
        .on_enqueue_assets(dashboard_assets);
}
