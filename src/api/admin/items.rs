//! Admin item listing with the views column

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::core::columns::{list_items, ListingParams, LISTING_TYPES};
use crate::core::content_types::{sanitize_key, PRIMARY_TYPE};
use crate::state::AppState;
use crate::store::{ContentItem, ItemId, ItemStatus, MAX_ITEM_ID};

/// GET /api/admin/items?post_type=page&orderby=post_views&order=desc&paged=1
pub async fn list_items_handler(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> impl IntoResponse {
    let content_type = params
        .post_type
        .as_deref()
        .map(sanitize_key)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| PRIMARY_TYPE.to_string());

    let columns = if LISTING_TYPES.contains(&content_type.as_str()) {
        state.hooks.columns(&content_type)
    } else {
        Vec::new()
    };

    let query_type = content_type.clone();
    let result = state
        .with_store(move |store| list_items(store, &query_type, &params))
        .await;

    match result {
        Some(Ok(rows)) => Json(json!({
            "success": true,
            "post_type": content_type,
            "columns": columns,
            "data": rows
        }))
        .into_response(),
        Some(Err(e)) => {
            tracing::error!("Listing {} failed: {}", content_type, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "message": "failed to list items"})),
            )
                .into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": "failed to list items"})),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertItemParams {
    pub id: ItemId,
    pub post_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_status")]
    pub status: ItemStatus,
    pub published_at: Option<DateTime<Utc>>,
}

fn default_status() -> ItemStatus {
    ItemStatus::Publish
}

/// POST /api/admin/items - Register or update a content item
pub async fn upsert_item_handler(
    State(state): State<AppState>,
    Json(params): Json<UpsertItemParams>,
) -> impl IntoResponse {
    let content_type = sanitize_key(&params.post_type);
    if params.id == 0 || content_type.is_empty() {
        return Json(json!({
            "success": false,
            "message": "id and post_type are required"
        }));
    }
    if params.id > MAX_ITEM_ID {
        return Json(json!({
            "success": false,
            "message": format!("id must not exceed {}", MAX_ITEM_ID)
        }));
    }

    let item = ContentItem {
        id: params.id,
        content_type,
        title: params.title,
        status: params.status,
        published_at: params.published_at.unwrap_or_else(Utc::now),
    };

    let id = item.id;
    match state.with_store(move |store| store.upsert_item(&item)).await {
        Some(Ok(())) => {
            tracing::info!(item = id, "Item saved");
            Json(json!({"success": true, "message": "saved"}))
        }
        Some(Err(e)) => {
            tracing::error!(item = id, "Failed to save item: {}", e);
            Json(json!({"success": false, "message": format!("save failed: {}", e)}))
        }
        None => Json(json!({"success": false, "message": "save failed"})),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteItemParams {
    pub id: ItemId,
}

/// DELETE /api/admin/items?id=1 - Remove an item and its metadata
pub async fn delete_item_handler(
    State(state): State<AppState>,
    Query(params): Query<DeleteItemParams>,
) -> impl IntoResponse {
    let id = params.id;
    match state.with_store(move |store| store.remove_item(id)).await {
        Some(Ok(true)) => {
            tracing::info!(item = id, "Item deleted");
            Json(json!({"success": true, "message": "item deleted"}))
        }
        Some(Ok(false)) => Json(json!({"success": false, "message": "item not found"})),
        Some(Err(e)) => {
            tracing::error!(item = id, "Failed to delete item: {}", e);
            Json(json!({"success": false, "message": format!("delete failed: {}", e)}))
        }
        None => Json(json!({"success": false, "message": "delete failed"})),
    }
}
