//! View counting
//!
//! One counter per content item, stored as a decimal string under
//! [`COUNT_KEY`]. The first qualifying view only initializes the counter to
//! `"0"`; every later qualifying view increments it.
//!
//! The read and the write are separate store calls. Two renders of the same
//! item racing each other can both read `n` and both write `n + 1`, losing a
//! view. Counts are approximate under concurrency.

use serde::{Deserialize, Serialize};

use crate::store::{parse_count, ItemId, MetadataStore, MAX_COUNT};

pub const COUNT_KEY: &str = "avc_count";

/// What the requester is allowed to do on the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    #[default]
    Visitor,
    ManageOptions,
}

/// A render of a public page, as reported by the host
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewRequest {
    /// Explicitly supplied item
    #[serde(default)]
    pub post_id: Option<ItemId>,
    /// Item the page is currently rendering, if any
    #[serde(default)]
    pub context_id: Option<ItemId>,
    /// Single item page rather than a listing or archive
    #[serde(default)]
    pub singular: bool,
    #[serde(default)]
    pub preview: bool,
    #[serde(skip)]
    pub capability: Capability,
}

impl ViewRequest {
    /// Explicit id first, then the rendering context; zero means absent
    pub fn content_id(&self) -> Option<ItemId> {
        self.post_id
            .filter(|id| *id != 0)
            .or(self.context_id.filter(|id| *id != 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotSingular,
    Preview,
    Administrator,
    MissingItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "value")]
pub enum ViewOutcome {
    Skipped(SkipReason),
    /// Counter created with `"0"`
    Initialized,
    /// Counter now holds this value
    Incremented(u64),
    /// Store failed; nothing recorded
    Failed,
}

/// Count a render if it qualifies as a view.
///
/// Never fails: store errors are logged and reported as [`ViewOutcome::Failed`].
pub fn record_view(store: &dyn MetadataStore, request: &ViewRequest) -> ViewOutcome {
    if !request.singular {
        return ViewOutcome::Skipped(SkipReason::NotSingular);
    }
    if request.preview {
        return ViewOutcome::Skipped(SkipReason::Preview);
    }
    if request.capability == Capability::ManageOptions {
        return ViewOutcome::Skipped(SkipReason::Administrator);
    }
    let Some(id) = request.content_id() else {
        return ViewOutcome::Skipped(SkipReason::MissingItem);
    };

    let current = match store.get(id, COUNT_KEY) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(item = id, error = %e, "Failed to read view count");
            return ViewOutcome::Failed;
        }
    };

    let (value, outcome) = match current.as_deref() {
        None | Some("") => {
            // Drop any blank leftover before initializing
            if let Err(e) = store.delete(id, COUNT_KEY) {
                tracing::warn!(item = id, error = %e, "Failed to clear view count");
                return ViewOutcome::Failed;
            }
            ("0".to_string(), ViewOutcome::Initialized)
        }
        Some(raw) => {
            let next = (parse_count(raw) + 1).min(MAX_COUNT);
            (next.to_string(), ViewOutcome::Incremented(next))
        }
    };

    match store.set(id, COUNT_KEY, &value) {
        Ok(()) => {
            tracing::trace!(item = id, count = %value, "View recorded");
            outcome
        }
        Err(e) => {
            tracing::warn!(item = id, error = %e, "Failed to write view count");
            ViewOutcome::Failed
        }
    }
}

/// Current count for an item; absent, malformed or unreadable values are 0
pub fn views(store: &dyn MetadataStore, id: ItemId) -> u64 {
    match store.get(id, COUNT_KEY) {
        Ok(v) => v.as_deref().map(parse_count).unwrap_or(0),
        Err(e) => {
            tracing::warn!(item = id, error = %e, "Failed to read view count");
            0
        }
    }
}
