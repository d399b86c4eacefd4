//! Views column for the admin item listing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::count::COUNT_KEY;
use crate::store::{
    Direction, ItemId, ItemQuery, ItemStatus, MetadataStore, OrderBy, Result,
};

/// Column key, also the `orderby` value that sorts by views
pub const VIEWS_COLUMN: &str = "post_views";
pub const VIEWS_COLUMN_TITLE: &str = "Views";

/// Listings that carry the views column
pub const LISTING_TYPES: [&str; 2] = ["post", "page"];

pub const DEFAULT_PER_PAGE: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    pub post_type: Option<String>,
    pub orderby: Option<String>,
    pub order: Option<String>,
    pub paged: Option<usize>,
    pub per_page: Option<usize>,
}

impl ListingParams {
    pub fn order_by(&self) -> OrderBy {
        if self.orderby.as_deref() != Some(VIEWS_COLUMN) {
            return OrderBy::Default;
        }

        let direction = match self.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => Direction::Asc,
            _ => Direction::Desc,
        };
        OrderBy::MetaNumeric {
            key: COUNT_KEY.to_string(),
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub id: ItemId,
    pub title: String,
    pub status: ItemStatus,
    pub published_at: DateTime<Utc>,
    pub views: String,
}

/// Raw stored value, or `"0"` when absent, empty or unreadable
pub fn column_value(store: &dyn MetadataStore, id: ItemId) -> String {
    match store.get(id, COUNT_KEY) {
        Ok(Some(v)) if !v.is_empty() && v != "0" => v,
        Ok(_) => "0".to_string(),
        Err(e) => {
            tracing::warn!(item = id, error = %e, "Failed to read views column");
            "0".to_string()
        }
    }
}

/// One page of the admin listing for `content_type`, any status
pub fn list_items(
    store: &dyn MetadataStore,
    content_type: &str,
    params: &ListingParams,
) -> Result<Vec<ListingRow>> {
    let per_page = params.per_page.filter(|n| *n > 0).unwrap_or(DEFAULT_PER_PAGE);
    let page = params.paged.unwrap_or(1).max(1);

    let query = ItemQuery::new(content_type)
        .order_by(params.order_by())
        .limit(per_page)
        .offset((page - 1).saturating_mul(per_page));

    Ok(store
        .query(&query)?
        .into_iter()
        .map(|item| ListingRow {
            views: column_value(store, item.id),
            id: item.id,
            title: item.title,
            status: item.status,
            published_at: item.published_at,
        })
        .collect())
}
