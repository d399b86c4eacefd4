//! Public API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use serde_json::json;

use crate::core::count::{self, Capability, ViewRequest};
use crate::state::AppState;
use crate::store::ItemId;

pub async fn ping_handler() -> impl IntoResponse {
    "pong"
}

/// POST /api/view - The host reports a page render
///
/// Always 204: the render pipeline must not depend on whether the view counted.
pub async fn view_handler(
    State(state): State<AppState>,
    Extension(capability): Extension<Capability>,
    body: Option<Json<ViewRequest>>,
) -> impl IntoResponse {
    let Some(Json(mut request)) = body else {
        tracing::debug!("Ignoring render notification without a valid body");
        return StatusCode::NO_CONTENT;
    };
    request.capability = capability;

    let hooks = state.hooks.clone();
    if let Some(outcomes) = state
        .with_store(move |store| hooks.render_head(store, &request))
        .await
    {
        tracing::debug!(?outcomes, "Render hooks ran");
    }

    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
pub struct ViewsParams {
    pub post_id: ItemId,
}

/// GET /api/views?post_id=1 - Current count without incrementing
pub async fn views_handler(
    State(state): State<AppState>,
    Query(params): Query<ViewsParams>,
) -> impl IntoResponse {
    let id = params.post_id;
    let views = state
        .with_store(move |store| count::views(store, id))
        .await
        .unwrap_or(0);

    Json(json!({
        "success": true,
        "message": "ok",
        "data": {
            "post_id": id,
            "views": views
        }
    }))
}
