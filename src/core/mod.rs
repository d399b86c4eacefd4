//! View counting and ranking over a [`MetadataStore`](crate::store::MetadataStore)

pub mod columns;
pub mod content_types;
pub mod count;
pub mod report;
