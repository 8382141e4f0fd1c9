#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An app over the in-memory store and an outbox mailer
/// - JSON request helpers
/// - Session cookie handling
/// - Account registration and login shortcuts

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use gatehouse_api::{
    app::{build_router, AppState, Stores},
    config::Config,
};
use gatehouse_shared::{
    auth::credential::CredentialParams,
    mail::{outbox::OutboxMailer, OutgoingMail},
    store::memory::MemoryStore,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<OutboxMailer>,
}

/// Status, headers and JSON body of a response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestResponse {
    /// The JSend `data` member
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn assert_success(&self) -> &Value {
        assert_eq!(self.status, StatusCode::OK, "body: {}", self.body);
        assert_eq!(self.body["status"], "success", "body: {}", self.body);
        self.data()
    }

    pub fn assert_fail(&self) -> &Value {
        assert_eq!(self.status, StatusCode::OK, "body: {}", self.body);
        assert_eq!(self.body["status"], "fail", "body: {}", self.body);
        self.data()
    }

    pub fn assert_error(&self, status: StatusCode) -> &str {
        assert_eq!(self.status, status, "body: {}", self.body);
        assert_eq!(self.body["status"], "error", "body: {}", self.body);
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestContext {
    /// Creates a new test context with an empty store
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Creates a test context after adjusting the default configuration
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.credential = CredentialParams::minimal();
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(OutboxMailer::new());
        let stores = Stores {
            accounts: store.clone(),
            sessions: store.clone(),
        };

        let state = AppState::with_services(config.clone(), stores, outbox.clone())
            .expect("Failed to build app state");

        Self {
            app: build_router(state),
            config,
            store,
            outbox,
        }
    }

    /// Sends a request, with the session token as a cookie when given
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(
                header::COOKIE,
                format!("{}={}", self.config.session.cookie_name, token),
            );
        }

        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    /// Sends a prepared request
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            set_cookie,
            body,
        }
    }

    /// Session token carried by a `Set-Cookie` header; `None` when the cookie is cleared
    pub fn session_token(&self, response: &TestResponse) -> Option<String> {
        let cookie = response.set_cookie.as_deref()?;
        let pair = cookie.split(';').next()?;
        let value = pair.strip_prefix(&format!("{}=", self.config.session.cookie_name))?;
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Registers an account with password `default` and returns its id
    pub async fn register(&self, username: &str, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "username": username,
                    "email": email,
                    "password": "default",
                    "password_again": "default"
                })),
            )
            .await;

        response.assert_success()["id"]
            .as_str()
            .expect("registered account has an id")
            .to_string()
    }

    /// Logs in and returns the session token
    pub async fn login(&self, login: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/session",
                None,
                Some(json!({ "email": login, "password": password })),
            )
            .await;

        assert_eq!(response.assert_success()["auth"], true);
        self.session_token(&response).expect("login sets the session cookie")
    }

    /// Registers and logs in; returns the account id and session token
    pub async fn signup(&self, username: &str, email: &str) -> (String, String) {
        let id = self.register(username, email).await;
        let token = self.login(email, "default").await;
        (id, token)
    }

    pub fn last_mail(&self) -> OutgoingMail {
        self.outbox.last().expect("a mail was sent")
    }
}

/// Activation key from the confirmation link in a mail body
///
/// Links end in `/{email}/{key}/`.
pub fn link_key(mail: &OutgoingMail, marker: &str) -> String {
    let start = mail
        .html_body
        .find(marker)
        .unwrap_or_else(|| panic!("no {} link in mail: {}", marker, mail.html_body));
    let path = &mail.html_body[start + marker.len()..];
    path.split('/')
        .nth(1)
        .expect("link carries a key")
        .to_string()
}
