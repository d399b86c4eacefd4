//! Top viewed items for a content type

use serde::Serialize;

use super::count::{views, COUNT_KEY};
use crate::store::{Direction, ItemQuery, MetadataStore, OrderBy};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPoint {
    pub label: String,
    pub value: u64,
}

/// Up to `page_size` published items of `content_type`, most viewed first.
///
/// `content_type` must already be sanitized. A failed query gives an empty
/// report and a failed counter read gives 0 for that item.
pub fn build_report(
    store: &dyn MetadataStore,
    content_type: &str,
    page_size: usize,
) -> Vec<DataPoint> {
    let query = ItemQuery::new(content_type)
        .published()
        .order_by(OrderBy::MetaNumeric {
            key: COUNT_KEY.to_string(),
            direction: Direction::Desc,
        })
        .limit(page_size);

    let items = match store.query(&query) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(content_type, error = %e, "Report query failed");
            return Vec::new();
        }
    };

    let mut points: Vec<DataPoint> = items
        .into_iter()
        .map(|item| DataPoint {
            value: views(store, item.id),
            label: item.title,
        })
        .collect();

    // Stable, so equal counts keep the store's order
    points.sort_by(|a, b| b.value.cmp(&a.value));
    points
}
