use crate::AppState;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Extension, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Wrap the application's view routes with the shared routes and layers: the
/// health check, static assets, the user allocator and the identity cookie.
pub fn define_routes(app_state: AppState, views: Router) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(views)
        .merge(static_routes(&app_state.config.static_dir))
        .layer(Extension(Arc::clone(&app_state.user_ids)))
        .layer(session_layer(&app_state))
}

// One cookie per controller, dropped when the browser session ends
fn session_layer(app_state: &AppState) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(format!("_lv_key_{}", app_state.config.app_name()))
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(app_state.config.is_production())
}

pub fn static_routes(static_dir: &str) -> Router {
    Router::new().nest_service("/static", ServeDir::new(static_dir))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{view::View, Controller};
    use crate::templates::Templates;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, request::Parts, Request, StatusCode};
    use clap::Parser;
    use domain::UserId;
    use service::config::Config;
    use tower::ServiceExt;

    fn app_state() -> AppState {
        AppState::new(Config::parse_from(["liveview_rs", "--app-name", "test"]))
    }

    fn app(app_state: AppState) -> Router {
        let controller = Arc::new(Controller::new(app_state.clone()).unwrap());
        let templates = Templates::from_sources(
            "index",
            [("index", "<h1>{{ app_name }}</h1>"), ("lv-error", "")],
        )
        .unwrap();
        let views = Router::new().route(
            "/",
            controller.handler(View::from_templates(templates)).unwrap(),
        );
        define_routes(app_state, views)
    }

    #[tokio::test]
    async fn health_check_responds_ok() {
        let response = app(app_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"healthy");
    }

    #[tokio::test]
    async fn mount_renders_page_and_sets_identity_cookie() {
        let app_state = app_state();
        let response = app(app_state.clone())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("_lv_key_test="));
        assert!(!cookie.to_ascii_lowercase().contains("max-age"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>test</h1>");
    }

    fn counter_app(app_state: AppState) -> Router {
        let controller = Arc::new(Controller::new(app_state.clone()).unwrap());
        let templates = || {
            Templates::from_sources(
                "index",
                [("index", "<p>{{ count }}</p>"), ("lv-error", "")],
            )
            .unwrap()
        };
        let views = Router::new()
            .route(
                "/",
                controller
                    .handler(View::from_templates(templates()).on_mount(|_: &Parts| {
                        (StatusCode::OK, domain::data!({"count": 7}))
                    }))
                    .unwrap(),
            )
            .route(
                "/gone",
                controller
                    .handler(View::from_templates(templates()).on_mount(|_: &Parts| {
                        (StatusCode::NOT_FOUND, domain::data!({"count": 99}))
                    }))
                    .unwrap(),
            );
        define_routes(app_state, views)
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn repeated_mounts_reuse_one_store_per_user() {
        let app_state = app_state();
        let app = counter_app(app_state.clone());

        let response = app.clone().oneshot(get("/", None)).await.unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();

        for _ in 0..50 {
            let response = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(app_state.users_ref().len(), 1);
        let store = app_state.users_ref().get_or_create(UserId(1));
        assert_eq!(store.get::<i64>("count").unwrap(), 7);
        assert_eq!(store.get::<String>("app_name").unwrap(), "test");
    }

    #[tokio::test]
    async fn failed_mount_leaves_the_store_untouched() {
        let app_state = app_state();
        let app = counter_app(app_state.clone());

        let response = app.clone().oneshot(get("/", None)).await.unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();

        let response = app.clone().oneshot(get("/gone", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let store = app_state.users_ref().get_or_create(UserId(1));
        assert_eq!(store.get::<i64>("count").unwrap(), 7);
    }

    #[tokio::test]
    async fn views_without_the_allocator_extension_answer_500() {
        let app_state = app_state();
        let controller = Arc::new(Controller::new(app_state.clone()).unwrap());
        let templates =
            Templates::from_sources("index", [("index", "<p></p>"), ("lv-error", "")]).unwrap();
        let app = Router::new()
            .route(
                "/",
                controller.handler(View::from_templates(templates)).unwrap(),
            )
            .layer(session_layer(&app_state));

        let response = app.oneshot(get("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"INTERNAL SERVER ERROR");
        assert!(app_state.users_ref().is_empty());
    }

    #[tokio::test]
    async fn upgrade_headers_without_a_live_connection_are_rejected() {
        let response = app(app_state())
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::CONNECTION, "upgrade")
                    .header(header::UPGRADE, "websocket")
                    .header(header::SEC_WEBSOCKET_VERSION, "13")
                    .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZQ==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error() || response.status().is_server_error());
    }
}
