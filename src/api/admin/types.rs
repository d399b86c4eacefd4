//! Content types and admin menu

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::core::content_types::PRIMARY_TYPE;
use crate::state::AppState;

/// GET /api/admin/types - Types offered by the analytics selector
pub async fn types_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "default": PRIMARY_TYPE,
        "data": state.types.selectable()
    }))
}

/// GET /api/admin/menu
pub async fn menu_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": state.hooks.admin_menu()
    }))
}
