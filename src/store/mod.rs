//! Metadata store port
//!
//! Everything the counter and the report know about the host's content lives
//! behind [`MetadataStore`]: a key-value table addressed by `(item id, key)`
//! plus a query over content items.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::str::FromStr;

pub type ItemId = u64;

/// Largest id a store accepts; ids are kept as signed 64-bit in SQLite
pub const MAX_ITEM_ID: ItemId = i64::MAX as ItemId;

/// Counters saturate here, where SQLite's integer cast does
pub const MAX_COUNT: u64 = i64::MAX as u64;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("failed to open database `{path}`: {source}"))]
    Open {
        path: String,
        source: rusqlite::Error,
    },
    #[snafu(display("sqlite error while {action}: {source}"))]
    Sqlite {
        action: &'static str,
        source: rusqlite::Error,
    },
    #[snafu(display("item id {id} is out of range"))]
    IdOutOfRange { id: ItemId },
    #[snafu(display("store lock poisoned"))]
    LockPoisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Publish,
    Draft,
    Private,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Publish => "publish",
            ItemStatus::Draft => "draft",
            ItemStatus::Private => "private",
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("unknown item status `{value}`"))]
pub struct UnknownStatus {
    value: String,
}

impl FromStr for ItemStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(ItemStatus::Publish),
            "draft" => Ok(ItemStatus::Draft),
            "private" => Ok(ItemStatus::Private),
            other => UnknownStatusSnafu { value: other }.fail(),
        }
    }
}

/// A publishable unit of content owned by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub content_type: String,
    pub title: String,
    pub status: ItemStatus,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Newest first, then highest id
    Default,
    /// Numeric value of a metadata key; a missing key counts as zero.
    /// Equal values keep the default order.
    MetaNumeric { key: String, direction: Direction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub content_type: String,
    /// Empty means any status
    pub statuses: Vec<ItemStatus>,
    pub order_by: OrderBy,
    pub limit: usize,
    pub offset: usize,
}

impl ItemQuery {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            statuses: Vec::new(),
            order_by: OrderBy::Default,
            limit: usize::MAX,
            offset: 0,
        }
    }

    pub fn published(mut self) -> Self {
        self.statuses = vec![ItemStatus::Publish];
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn matches(&self, item: &ContentItem) -> bool {
        item.content_type == self.content_type
            && (self.statuses.is_empty() || self.statuses.contains(&item.status))
    }
}

pub trait MetadataStore: Send + Sync {
    /// `None` when the key was never written
    fn get(&self, id: ItemId, key: &str) -> Result<Option<String>>;

    fn set(&self, id: ItemId, key: &str, value: &str) -> Result<()>;

    fn delete(&self, id: ItemId, key: &str) -> Result<()>;

    fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>>;

    fn upsert_item(&self, item: &ContentItem) -> Result<()>;

    fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>>;

    /// Removes the item together with all of its metadata
    fn remove_item(&self, id: ItemId) -> Result<bool>;
}

/// Integer value of a stored counter.
///
/// Reads like SQLite's `CAST(.. AS INTEGER)` clamped at zero: optional
/// leading whitespace, an optional sign, then the leading decimal digits.
/// `"+50"` is 50, `"12abc"` is 12, negatives and text without digits are 0.
pub fn parse_count(raw: &str) -> u64 {
    let trimmed =
        raw.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r'));
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);

    if negative || digits.is_empty() {
        0
    } else {
        digits.parse::<u64>().map_or(MAX_COUNT, |n| n.min(MAX_COUNT))
    }
}
