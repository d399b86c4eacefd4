//! Admin API handlers

mod analytics;
mod items;
mod types;

pub use analytics::{dashboard_handler, report_handler};
pub use items::{delete_item_handler, list_items_handler, upsert_item_handler};
pub use types::{menu_handler, types_handler};
