//! Request helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

/// Raw admin token whose hash `AdminConfig::for_testing` carries.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// A request against the router.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestRequest<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub host: Option<&'a str>,
    pub headers: Vec<(&'a str, &'a str)>,
    pub body: Option<Value>,
    pub token: Option<&'a str>,
}

#[allow(dead_code)]
impl<'a> TestRequest<'a> {
    pub fn new(method: &'a str, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            host: None,
            headers: Vec::new(),
            body: None,
            token: None,
        }
    }

    pub fn host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }

    pub fn header(mut self, name: &'a str, value: &'a str) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn admin(self) -> Self {
        self.token(ADMIN_TOKEN)
    }

    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Send through a clone of `router`, returning status and JSON body
    /// (`Null` when the body is empty or not JSON).
    pub async fn send(self, router: &axum::Router) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(self.method).uri(self.uri);

        if let Some(host) = self.host {
            builder = builder.header("Host", host);
        }
        for (name, value) in &self.headers {
            builder = builder.header(*name, *value);
        }
        if let Some(token) = self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let body = match self.body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let request = builder.body(body).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }
}
