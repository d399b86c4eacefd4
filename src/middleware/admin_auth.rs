use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use dashmap::DashMap;
use serde_json::json;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::capability::header_token;
use crate::state::AppState;

const MAX_FAILS: u32 = 5;
const LOCKOUT: Duration = Duration::from_secs(300); // 5 minutes

/// Failed admin attempts per client: (fail_count, last_fail_time)
#[derive(Debug, Default)]
pub struct LoginGuard {
    fails: DashMap<String, (u32, Instant)>,
}

impl LoginGuard {
    /// Seconds left if `client` is locked out
    pub fn locked_for(&self, client: &str, now: Instant) -> Option<u64> {
        let entry = self.fails.get(client)?;
        let (count, last_time) = *entry.value();
        let elapsed = now.saturating_duration_since(last_time);
        if count >= MAX_FAILS && elapsed < LOCKOUT {
            Some((LOCKOUT - elapsed).as_secs().max(1))
        } else {
            None
        }
    }

    /// Count a failure and return the attempts inside the current window
    pub fn record_failure(&self, client: &str, now: Instant) -> u32 {
        self.prune(now);

        let mut entry = self.fails.entry(client.to_string()).or_insert((0, now));
        let (count, last_time) = entry.value_mut();
        *count += 1;
        *last_time = now;
        *count
    }

    pub fn clear(&self, client: &str) {
        self.fails.remove(client);
    }

    /// Forget clients whose last failure is older than the lockout window
    fn prune(&self, now: Instant) {
        self.fails
            .retain(|_, (_, last_time)| now.saturating_duration_since(*last_time) < LOCKOUT);
    }
}

/// Key for the lockout map.
///
/// Proxy headers are client-controlled, so they are only used when the
/// service is configured to sit behind a trusted proxy.
fn client_key(req: &Request<Body>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .or_else(|| req.headers().get("X-Real-IP"))
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// `token=` query parameter, for opening the dashboard in a browser
pub fn query_token(query: Option<&str>) -> Option<String> {
    query?.split('&').find_map(|pair| {
        pair.strip_prefix("token=")
            .map(|t| urlencoding::decode(t).map(|d| d.into_owned()).unwrap_or_default())
    })
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    // If ADMIN_TOKEN is not set, allow access (for development)
    if state.admin_token.is_empty() {
        tracing::warn!("ADMIN_TOKEN is not set! Admin pages are unprotected.");
        return next.run(req).await;
    }

    let client = client_key(&req, state.trust_proxy);
    let guard = &state.login_guard;

    if let Some(remaining) = guard.locked_for(&client, Instant::now()) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(json!({
                "success": false,
                "message": format!("Too many failed attempts, retry in {} seconds", remaining)
            })),
        )
            .into_response();
    }

    let is_authorized = header_token(req.headers()) == Some(&*state.admin_token)
        || query_token(req.uri().query()).as_deref() == Some(&*state.admin_token);

    if is_authorized {
        guard.clear(&client);
        next.run(req).await
    } else {
        let attempts = guard.record_failure(&client, Instant::now());
        tracing::warn!(client = %client, attempts, "Rejected admin request");

        (
            StatusCode::UNAUTHORIZED,
            axum::Json(json!({"success": false, "message": "unauthorized"})),
        )
            .into_response()
    }
}
