#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::HeaderMap},
};
use http_body_util::BodyExt;
use mexicapp::api::{self, AppState};
use mexicapp::config::Config;
use mexicapp::db::{Location, NewLocation};
use mexicapp::entities::locations::{LocationCategory, LocationStatus};
use mexicapp::services::MemoryMailer;
use mexicapp::state::SharedState;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "tr4vel-mx-2024";

pub const TEST_JWT_SECRET: &str = "integration-tests-signing-key-0123456789";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<MemoryMailer>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

pub async fn spawn_app() -> TestApp {
    let db_path = std::env::temp_dir().join(format!("mexicapp-test-{}.db", Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}?mode=rwc", db_path.display());
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.scheduler.enabled = false;
    config.observability.metrics_enabled = false;

    let mailer = Arc::new(MemoryMailer::new());
    let shared = SharedState::with_mailer(config, mailer.clone())
        .await
        .expect("Failed to create shared state");
    let state = api::create_app_state(Arc::new(shared), None);
    let router = api::router(state.clone());

    TestApp {
        router,
        state,
        mailer,
        db_path,
    }
}

/// Drives one request through a router clone, so concurrent callers can own theirs.
pub async fn send(
    router: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    read_response(router.oneshot(request).await.unwrap()).await
}

pub async fn read_response(response: axum::response::Response) -> Response {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Response {
        status,
        headers,
        body,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        send(self.router.clone(), method, uri, body, token).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.request("GET", uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> Response {
        self.request("POST", uri, Some(body), token).await
    }

    pub async fn register(&self, username: &str) -> Response {
        self.post(
            "/api/v1/auth/register",
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
                "first_name": "Test",
            }),
            None,
        )
        .await
    }

    pub async fn verify(&self, username: &str) -> Response {
        let token = self
            .mailer
            .last_token_for(&format!("{username}@example.com"))
            .expect("verification mail");
        self.post("/api/v1/auth/verify-email", json!({ "token": token }), None)
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.post(
            "/api/v1/auth/login",
            json!({ "username": username, "password": password, "device_name": "Test phone" }),
            None,
        )
        .await
    }

    /// Registers, verifies and logs in a fresh user.
    pub async fn signed_in_user(&self, username: &str) -> Tokens {
        assert_eq!(self.register(username).await.status, StatusCode::CREATED);
        assert_eq!(self.verify(username).await.status, StatusCode::OK);
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        Tokens {
            access: response.body["data"]["access"].as_str().unwrap().to_string(),
            refresh: response.body["data"]["refresh"].as_str().unwrap().to_string(),
        }
    }

    pub async fn add_mood(&self, slug: &str) -> i32 {
        self.state
            .store()
            .upsert_mood(&slug.to_uppercase(), slug)
            .await
            .unwrap()
            .id
    }

    pub async fn add_location(&self, qr_code: &str, status: LocationStatus, moods: &[&str]) -> Location {
        self.state
            .store()
            .create_location_if_missing(NewLocation {
                name: format!("Venue {qr_code}"),
                description: "A place".to_string(),
                category: LocationCategory::Restaurant,
                status,
                city: "CDMX".to_string(),
                address: "Somewhere 1".to_string(),
                latitude: Some(19.41),
                longitude: Some(-99.17),
                qr_code: qr_code.to_string(),
                image_url: String::new(),
                vibe_match_score: 70,
                mood_slugs: moods.iter().map(ToString::to_string).collect(),
            })
            .await
            .unwrap()
            .expect("new location")
    }
}
