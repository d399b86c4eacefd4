//! View analytics dashboard and report

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use crate::core::report::{build_report, DataPoint};
use crate::render::Dashboard;
use crate::state::AppState;
use crate::static_files;

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub post_type_dropdown: Option<String>,
    /// Present when the page was opened with `?token=`
    pub token: Option<String>,
}

async fn report_for(state: &AppState, content_type: String, count: usize) -> Vec<DataPoint> {
    state
        .with_store(move |store| build_report(store, &content_type, count))
        .await
        .unwrap_or_default()
}

/// GET /admin/analytics?post_type_dropdown=page
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Response {
    let selected = state.types.resolve(params.post_type_dropdown.as_deref());
    let points = report_for(&state, selected.clone(), state.page_size).await;

    let Some(template) = static_files::read_text("dashboard.html") else {
        tracing::error!("Dashboard template missing");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Dashboard template missing").into_response();
    };

    let types = state.types.selectable();
    let assets = state.hooks.assets();
    let dashboard = Dashboard {
        selected: &selected,
        types: &types,
        points: &points,
        assets: &assets,
        token: params.token.as_deref(),
    };

    match dashboard.render(&template) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render dashboard").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub post_type: Option<String>,
    pub count: Option<usize>,
}

/// GET /api/admin/report?post_type=post&count=20
pub async fn report_handler(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> impl IntoResponse {
    let content_type = state.types.resolve(params.post_type.as_deref());
    let count = params
        .count
        .filter(|n| *n > 0)
        .unwrap_or(state.page_size)
        .min(state.page_size);

    let points = report_for(&state, content_type.clone(), count).await;

    Json(json!({
        "success": true,
        "post_type": content_type,
        "empty": points.is_empty(),
        "data": points
    }))
}
