#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lumen_api::auth::jwt::{generate_access_token, JwtConfig};
use lumen_api::background::purge::PurgeConfig;
use lumen_api::config::ServerConfig;
use lumen_api::router::build_app_router;
use lumen_api::state::AppState;
use lumen_api::ws::WsManager;
use lumen_core::upload::UploadLimits;
use lumen_events::EventBus;
use lumen_storage::MemoryStorage;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Owner of galleries created through [`TestApp::create_gallery`].
pub const OWNER: &str = "user_owner";

/// A second, non-owning user.
pub const VIEWER: &str = "user_viewer";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        upload_limits: UploadLimits::default(),
        purge: PurgeConfig::default(),
    }
}

/// The router plus handles to the in-process services behind it.
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryStorage>,
    pub event_bus: Arc<EventBus>,
    pub config: ServerConfig,
}

/// Build the full application router, backed by in-memory object storage,
/// using the same middleware stack as production.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let storage = Arc::new(MemoryStorage::new("https://cdn.test"));
    let event_bus = Arc::new(EventBus::default());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage: storage.clone(),
        upload_url_expiry: Duration::from_secs(600),
        ws_manager: Arc::new(WsManager::new()),
        event_bus: Arc::clone(&event_bus),
    };

    TestApp {
        router: build_app_router(state, &config),
        storage,
        event_bus,
        config,
    }
}

impl TestApp {
    /// Mint a session token for `user_id`.
    pub fn token(&self, user_id: &str) -> String {
        generate_access_token(user_id, &self.config.jwt).expect("token generation")
    }

    pub async fn get(&self, user_id: &str, uri: &str) -> Response<Body> {
        self.send(Method::GET, user_id, uri, None).await
    }

    pub async fn post_json(&self, user_id: &str, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::POST, user_id, uri, Some(body)).await
    }

    pub async fn put_json(&self, user_id: &str, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::PUT, user_id, uri, Some(body)).await
    }

    pub async fn patch_json(&self, user_id: &str, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::PATCH, user_id, uri, Some(body)).await
    }

    pub async fn delete(&self, user_id: &str, uri: &str) -> Response<Body> {
        self.send(Method::DELETE, user_id, uri, None).await
    }

    /// Create a gallery owned by [`OWNER`] and return its id.
    pub async fn create_gallery(&self, name: &str) -> i64 {
        let response = self
            .post_json(OWNER, "/api/v1/galleries", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status(), 201, "gallery creation should succeed");
        body_json(response).await["data"]["id"]
            .as_i64()
            .expect("gallery id")
    }

    /// Negotiate uploads for `files` (`(name, content_type, size)`) as [`OWNER`].
    pub async fn negotiate(&self, gallery_id: i64, files: &[(&str, &str, u64)]) -> Response<Body> {
        let files: Vec<Value> = files
            .iter()
            .map(|(name, content_type, size)| {
                serde_json::json!({ "name": name, "type": content_type, "size": size })
            })
            .collect();
        self.post_json(
            OWNER,
            &format!("/api/v1/galleries/{gallery_id}/uploads"),
            serde_json::json!({ "files": files }),
        )
        .await
    }

    /// Simulate the client's direct upload for a negotiated target.
    pub fn complete_upload(&self, target: &Value, size: i64) {
        let public_url = target["public_url"].as_str().expect("public_url");
        let key = public_url
            .strip_prefix("https://cdn.test/")
            .expect("public url on the test cdn");
        self.storage.put_object(key, size);
    }

    async fn send(
        &self,
        method: Method,
        user_id: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token(user_id)));
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Send an unauthenticated GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
