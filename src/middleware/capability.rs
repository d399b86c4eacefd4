use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Response},
    middleware::Next,
};

use crate::core::count::Capability;
use crate::state::AppState;

/// Token from `Authorization: Bearer <token>`, a bare `Authorization` value,
/// or `X-Admin-Token`
pub fn header_token(headers: &HeaderMap) -> Option<&str> {
    match headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        Some(header) => Some(header.strip_prefix("Bearer ").unwrap_or(header)),
        None => headers.get("X-Admin-Token").and_then(|h| h.to_str().ok()),
    }
}

/// Capability implied by the request headers
pub fn capability(headers: &HeaderMap, admin_token: &str) -> Capability {
    if !admin_token.is_empty() && header_token(headers) == Some(admin_token) {
        Capability::ManageOptions
    } else {
        Capability::Visitor
    }
}

/// Attach the requester's [`Capability`] as a request extension
pub async fn capability_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let cap = capability(req.headers(), &state.admin_token);
    req.extensions_mut().insert(cap);
    next.run(req).await
}
