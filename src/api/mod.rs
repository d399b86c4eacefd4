pub mod admin;
pub mod handlers;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::hooks::ANALYTICS_PATH;
use crate::middleware;
use crate::state::AppState;
use crate::static_files;

pub fn cors_layer(cors: &str) -> CorsLayer {
    if cors == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = cors
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn router(state: AppState) -> Router {
    // Admin routes (protected)
    let admin_routes = Router::new()
        .route(ANALYTICS_PATH, get(admin::dashboard_handler))
        .route("/api/admin/report", get(admin::report_handler))
        .route(
            "/api/admin/items",
            get(admin::list_items_handler)
                .post(admin::upsert_item_handler)
                .delete(admin::delete_item_handler),
        )
        .route("/api/admin/types", get(admin::types_handler))
        .route("/api/admin/menu", get(admin::menu_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/api/view", post(handlers::view_handler))
        .route("/api/views", get(handlers::views_handler))
        .route("/ping", get(handlers::ping_handler))
        .route("/static/*path", get(static_files::serve_static))
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::capability::capability_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreKind};
    use crate::core::count::COUNT_KEY;
    use crate::store::{ContentItem, ItemStatus, MemoryStore, MetadataStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const TOKEN: &str = "s3cret";

    fn config() -> Config {
        Config {
            web_addr: "127.0.0.1:0".to_string(),
            cors: "*".to_string(),
            admin_token: TOKEN.to_string(),
            trust_proxy: true,
            store: StoreKind::Memory,
            db_file: String::new(),
            page_size: 20,
            extra_types: vec![("product".to_string(), "Products".to_string())],
        }
    }

    fn setup() -> (Arc<MemoryStore>, Router) {
        setup_with(config())
    }

    fn setup_with(config: Config) -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), &config);
        (store, router(state))
    }

    fn publish(store: &MemoryStore, id: u64, content_type: &str, title: &str, count: Option<&str>) {
        store
            .upsert_item(&ContentItem {
                id,
                content_type: content_type.to_string(),
                title: title.to_string(),
                status: ItemStatus::Publish,
                published_at: Utc.with_ymd_and_hms(2024, 5, id as u32, 0, 0, 0).unwrap(),
            })
            .unwrap();
        if let Some(c) = count {
            store.set(id, COUNT_KEY, c).unwrap();
        }
    }

    fn view(body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/view")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn admin_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-Admin-Token", TOKEN)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, req).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn ping() {
        let (_, app) = setup();
        let req = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        assert_eq!(send(&app, req).await, (StatusCode::OK, "pong".to_string()));
    }

    #[tokio::test]
    async fn visitor_views_are_counted() {
        let (store, app) = setup();

        for expected in ["0", "1", "2"] {
            let (status, _) = send(&app, view(json!({"post_id": 5, "singular": true}), None)).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
            assert_eq!(store.get(5, COUNT_KEY).unwrap().as_deref(), Some(expected));
        }

        let req = Request::builder()
            .uri("/api/views?post_id=5")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send_json(&app, req).await;
        assert_eq!(body["data"]["views"], 2);
    }

    #[tokio::test]
    async fn admin_and_listing_renders_are_not_counted() {
        let (store, app) = setup();

        let admin = view(json!({"post_id": 5, "singular": true}), Some(TOKEN));
        let listing = view(json!({"post_id": 5, "singular": false}), None);
        let preview = view(json!({"post_id": 5, "singular": true, "preview": true}), None);

        for req in [admin, listing, preview] {
            let (status, _) = send(&app, req).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }
        assert_eq!(store.get(5, COUNT_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn bad_render_body_still_no_content() {
        let (_, app) = setup();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/view")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn admin_routes_require_token() {
        let (_, app) = setup();
        let req = Request::builder()
            .uri("/api/admin/report")
            .header("X-Forwarded-For", "203.0.113.7")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn repeated_failures_lock_out() {
        let (_, app) = setup();
        let attempt = |token: &str| {
            Request::builder()
                .uri("/api/admin/types")
                .header("X-Forwarded-For", "198.51.100.23")
                .header("X-Admin-Token", token.to_string())
                .body(Body::empty())
                .unwrap()
        };

        for _ in 0..5 {
            let (status, _) = send(&app, attempt("wrong")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _) = send(&app, attempt(TOKEN)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn report_is_sorted_and_capped() {
        let (store, app) = setup();
        publish(&store, 1, "post", "Five", Some("5"));
        publish(&store, 2, "post", "Zero", None);
        publish(&store, 3, "post", "Seventeen", Some("17"));
        publish(&store, 4, "post", "Three", Some("3"));

        let (status, body) = send_json(&app, admin_get("/api/admin/report")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["post_type"], "post");
        let values: Vec<u64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["value"].as_u64().unwrap())
            .collect();
        assert_eq!(values, vec![17, 5, 3, 0]);

        let (_, body) = send_json(&app, admin_get("/api/admin/report?count=2")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn excluded_type_falls_back_to_post() {
        let (store, app) = setup();
        publish(&store, 1, "post", "A post", Some("1"));
        publish(&store, 2, "attachment", "An image", Some("99"));

        let (_, body) =
            send_json(&app, admin_get("/api/admin/report?post_type=attachment")).await;
        assert_eq!(body["post_type"], "post");
        assert_eq!(body["data"][0]["label"], "A post");
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dashboard_renders_chart_or_no_data() {
        let (store, app) = setup();
        publish(&store, 1, "post", "<b>Bold</b> & 'quoted'", Some("4"));

        let (status, html) = send(&app, admin_get("/admin/analytics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("chartContainer"));
        assert!(html.contains(r#""y":4"#));
        assert!(!html.contains("<b>Bold</b>"));
        assert!(html.contains(r#"<option value="product">Products</option>"#));

        let (_, html) = send(
            &app,
            admin_get("/admin/analytics?post_type_dropdown=product"),
        )
        .await;
        assert!(html.contains("No Data Found"));
        assert!(!html.contains("chartContainer"));
        assert!(html.contains(r#"<option value="product" selected>Products</option>"#));
    }

    #[tokio::test]
    async fn dashboard_form_keeps_query_token() {
        let (_, app) = setup();
        let browser = |uri: String| {
            Request::builder()
                .uri(uri)
                .header("X-Forwarded-For", "198.51.100.40")
                .body(Body::empty())
                .unwrap()
        };

        let (status, html) = send(&app, browser(format!("/admin/analytics?token={TOKEN}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(&format!(r#"<input type="hidden" name="token" value="{TOKEN}" />"#)));

        // What the selector form submits
        let (status, html) = send(
            &app,
            browser(format!(
                "/admin/analytics?page=avc-views-analytics&token={TOKEN}&post_type_dropdown=page"
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(r#"<option value="page" selected>Pages</option>"#));

        // Header-authenticated pages have no token to carry
        let (_, html) = send(&app, admin_get("/admin/analytics")).await;
        assert!(!html.contains(r#"name="token""#));
    }

    #[tokio::test]
    async fn type_labels_cannot_inject_markup() {
        let (_, app) = setup_with(Config {
            extra_types: vec![
                ("evil".to_string(), "{{CONTENT}}".to_string()),
                ("worse".to_string(), "</select><script>x()</script>".to_string()),
            ],
            ..config()
        });

        let (status, html) = send(&app, admin_get("/admin/analytics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(html.matches("No Data Found").count(), 1);
        assert!(html.contains(r#"<option value="evil">{{CONTENT}}</option>"#));
        assert!(!html.contains("<script>x()"));
    }

    #[tokio::test]
    async fn forwarded_for_is_ignored_without_trusted_proxy() {
        let (_, app) = setup_with(Config {
            trust_proxy: false,
            ..config()
        });
        let attempt = |ip: String, token: &str| {
            Request::builder()
                .uri("/api/admin/types")
                .header("X-Forwarded-For", ip)
                .header("X-Admin-Token", token.to_string())
                .body(Body::empty())
                .unwrap()
        };

        for n in 0..5 {
            let (status, _) = send(&app, attempt(format!("192.0.2.{n}"), "wrong")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _) = send(&app, attempt("192.0.2.99".to_string(), TOKEN)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn listing_sorts_by_views_column() {
        let (store, app) = setup();
        publish(&store, 1, "page", "Nine", Some("9"));
        publish(&store, 2, "page", "None", None);
        publish(&store, 3, "page", "Ten", Some("10"));

        let (status, body) = send_json(
            &app,
            admin_get("/api/admin/items?post_type=page&orderby=post_views&order=desc"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columns"][0]["key"], "post_views");
        let views: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["views"].as_str().unwrap())
            .collect();
        assert_eq!(views, vec!["10", "9", "0"]);
    }

    #[tokio::test]
    async fn item_lifecycle() {
        let (store, app) = setup();

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/items")
            .header("X-Admin-Token", TOKEN)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"id": 8, "post_type": "post", "title": "Hello"}).to_string(),
            ))
            .unwrap();
        let (_, body) = send_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(store.get_item(8).unwrap().unwrap().title, "Hello");

        send(&app, view(json!({"post_id": 8, "singular": true}), None)).await;
        assert!(store.get(8, COUNT_KEY).unwrap().is_some());

        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/api/admin/items?id=8")
            .header("X-Admin-Token", TOKEN)
            .body(Body::empty())
            .unwrap();
        let (_, body) = send_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(store.get(8, COUNT_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_item_ids_are_rejected() {
        let (store, app) = setup();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/items")
            .header("X-Admin-Token", TOKEN)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"id": u64::MAX, "post_type": "post", "title": "Huge"}).to_string(),
            ))
            .unwrap();

        let (status, body) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(store.get_item(u64::MAX).unwrap(), None);
    }

    #[tokio::test]
    async fn menu_lists_analytics_page() {
        let (_, app) = setup();
        let (_, body) = send_json(&app, admin_get("/api/admin/menu")).await;
        assert_eq!(body["data"][0]["slug"], "avc-views-analytics");
        assert_eq!(body["data"][0]["path"], "/admin/analytics");
    }

    #[tokio::test]
    async fn static_assets_are_served() {
        let (_, app) = setup();
        let req = Request::builder()
            .uri("/static/chart.js")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("avc-chart-data"));
    }
}
