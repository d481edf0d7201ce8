#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use joss_api::config::AppConfig;
use joss_api::{router, AppState, Backends};
use joss_shared::clients::{EmailKind, MemoryBlobStore, OutboxNotifier};

pub const BOUNDARY: &str = "joss-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub outbox: Arc<OutboxNotifier>,
    pub blobs: Arc<MemoryBlobStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::for_tests())
}

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    let outbox = Arc::new(OutboxNotifier::new());
    let blobs = Arc::new(MemoryBlobStore::new(&config.s3_public_url));
    let backends = Backends {
        notifier: outbox.clone(),
        blobs: blobs.clone(),
        ..Backends::in_memory(&config)
    };
    let state = Arc::new(AppState::new(config, backends, None).expect("state"));

    TestApp {
        app: router(state.clone()),
        state,
        outbox,
        blobs,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn json(&self, method: Method, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn upload(&self, path: &str, token: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.json(
            Method::POST,
            "/users",
            json!({ "username": username, "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Signs up and logs in; returns `(account id, session token)`.
    pub async fn signed_in_user(&self, username: &str, email: &str) -> (String, String) {
        let created = self.signup(username, email, "longenough1").await;
        assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
        let id = created.body["data"]["id"].as_str().unwrap().to_string();

        let login = self
            .json(
                Method::POST,
                "/auth/login",
                json!({ "email": email, "password": "longenough1" }),
                None,
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        (id, login.body["data"]["token"].as_str().unwrap().to_string())
    }

    /// Raw token from the most recent e-mail of `kind` sent to `email`.
    pub fn last_token(&self, kind: EmailKind, email: &str) -> String {
        let link = self.outbox.last_link(kind, email).expect("no email sent");
        link.rsplit("token=").next().unwrap().to_string()
    }
}

pub fn multipart(file: Option<(&str, &[u8])>, title: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(title) = title {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n").as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
