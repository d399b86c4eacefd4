//! In-memory metadata store

use dashmap::DashMap;
use snafu::ensure;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{
    parse_count, ContentItem, Direction, IdOutOfRangeSnafu, ItemId, ItemQuery, MetadataStore,
    OrderBy, Result, MAX_ITEM_ID,
};

/// Items and metadata kept in sharded maps.
///
/// Each call locks only the shard it touches, so a `get` followed by a `set`
/// on the same key is two independent operations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<ItemId, ContentItem>,
    meta: DashMap<ItemId, HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn default_order(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.id.cmp(&a.id))
}

impl MetadataStore for MemoryStore {
    fn get(&self, id: ItemId, key: &str) -> Result<Option<String>> {
        Ok(self.meta.get(&id).and_then(|m| m.get(key).cloned()))
    }

    fn set(&self, id: ItemId, key: &str, value: &str) -> Result<()> {
        ensure!(id <= MAX_ITEM_ID, IdOutOfRangeSnafu { id });
        self.meta
            .entry(id)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, id: ItemId, key: &str) -> Result<()> {
        if let Some(mut m) = self.meta.get_mut(&id) {
            m.remove(key);
        }
        Ok(())
    }

    fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .items
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        match &query.order_by {
            OrderBy::Default => items.sort_by(default_order),
            OrderBy::MetaNumeric { key, direction } => {
                let mut keyed: Vec<(u64, ContentItem)> = items
                    .into_iter()
                    .map(|item| -> Result<(u64, ContentItem)> {
                        let value = self
                            .get(item.id, key)?
                            .map(|v| parse_count(&v))
                            .unwrap_or(0);
                        Ok((value, item))
                    })
                    .collect::<Result<_>>()?;

                keyed.sort_by(|(va, a), (vb, b)| {
                    let by_value = match direction {
                        Direction::Desc => vb.cmp(va),
                        Direction::Asc => va.cmp(vb),
                    };
                    by_value.then_with(|| default_order(a, b))
                });

                items = keyed.into_iter().map(|(_, item)| item).collect();
            }
        }

        Ok(items
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    fn upsert_item(&self, item: &ContentItem) -> Result<()> {
        ensure!(item.id <= MAX_ITEM_ID, IdOutOfRangeSnafu { id: item.id });
        self.items.insert(item.id, item.clone());
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    fn remove_item(&self, id: ItemId) -> Result<bool> {
        self.meta.remove(&id);
        Ok(self.items.remove(&id).is_some())
    }
}
