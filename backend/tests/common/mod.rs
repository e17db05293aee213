#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use serde_json::Value;
use tower::ServiceExt;

use muslimsdeen::api::router;
use muslimsdeen::test_utils::{FakeAuthProvider, InMemoryBackend, test_state};

pub const BOUNDARY: &str = "muslimsdeen-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub backend: InMemoryBackend,
    pub auth: Arc<FakeAuthProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        let backend = InMemoryBackend::default();
        let auth = Arc::new(FakeAuthProvider::default());
        auth.add_user("admin-1", "admin@example.com", "secret1", "প্রশাসক");
        auth.add_user("user-1", "user@example.com", "secret2", "সাধারণ ব্যবহারকারী");
        backend.store.grant_admin("admin-1");
        let app = router(test_state(&backend, auth.clone()));
        Self { app, backend, auth }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("router is infallible")
    }

    /// Signs in through `/login` and returns the `Cookie` header value.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self.send(form_post("/login", &format!("email={}&password={}", email.replace('@', "%40"), password), None)).await;
        assert_eq!(response.status(), 200, "login of {} failed", email);
        session_cookie(&response).expect("session cookie")
    }

    pub async fn admin_cookie(&self) -> String {
        self.login("admin@example.com", "secret1").await
    }
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_string)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_post(uri: &str, parts: &[Part<'_>], cookie: &str) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

pub async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response.headers().get(header::LOCATION)?.to_str().ok()
}
