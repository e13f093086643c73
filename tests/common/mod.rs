#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use erpnext_bridge::config::Config;
use erpnext_bridge::crypto::CredentialCipher;
use erpnext_bridge::db::Storage;
use erpnext_bridge::types::user::CreateUserInput;
use erpnext_bridge::{AppState, app_router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const CLIENT_EMAIL: &str = "shop@example.com";
pub const PASSWORD: &str = "correct-horse-battery";
/// ERP domain for tests that never reach ERPNext.
pub const UNREACHABLE_ERP: &str = "http://127.0.0.1:9";

pub struct Harness {
    pub app: Router,
    pub client_id: String,
    _dir: TempDir,
}

impl Harness {
    pub async fn send(&self, req: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    /// Logs in and returns the `name=value` pair to send back as a cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .send(json_request(
                "POST",
                "/api/v1/users/login",
                json!({ "email": email, "password": password }),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("login did not set a cookie")
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        set_cookie
            .split(';')
            .next()
            .expect("empty set-cookie")
            .to_string()
    }

    pub async fn client_session(&self) -> String {
        self.login(CLIENT_EMAIL, PASSWORD).await
    }

    pub async fn admin_session(&self) -> String {
        self.login(ADMIN_EMAIL, PASSWORD).await
    }
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: "integration-test-secret".into(),
        erp_secret_key: "11".repeat(32),
        encryption_secret: "e".repeat(32),
        ..Config::default()
    }
}

/// Fresh database with one admin and one client bound to `erp_domain`.
pub async fn harness(erp_domain: &str, cfg: Config) -> Harness {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("bridge.sqlite");
    let storage = Storage::connect(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open sqlite");

    let state = AppState::new(
        cfg,
        storage,
        reqwest::Client::new(),
        CredentialCipher::new([7u8; 32]),
    );

    let admin: CreateUserInput = serde_json::from_value(json!({
        "email": ADMIN_EMAIL,
        "password": PASSWORD,
        "role": "admin"
    }))
    .unwrap();
    state.users.create_user(admin).await.expect("admin seed failed");

    let client: CreateUserInput = serde_json::from_value(json!({
        "email": CLIENT_EMAIL,
        "password": PASSWORD,
        "role": "client",
        "erpDomain": erp_domain,
        "apiKey": "api-key",
        "apiSecret": "api-secret"
    }))
    .unwrap();
    let client_id = state.users.create_user(client).await.expect("client seed failed");

    Harness {
        app: app_router(state),
        client_id,
        _dir: dir,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    bare_request("GET", uri, cookie)
}

pub fn bare_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}
