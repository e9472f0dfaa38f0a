//! Common test utilities for integration tests.
//!
//! Builds the full router over the in-memory store, so no database is needed.

// Not every integration test binary uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::Response,
    Router,
};
use coconut_api::app::{create_app, AppState, Stores};
use coconut_api::config::Config;
use coconut_api::containers::models::{ContainerState, LogStream};
use coconut_api::containers::{
    ContainerDetails, ContainerError, ContainerRuntime, ContainerSummary, LogLine, RuntimeVersion,
};
use domain::services::InMemoryStore;
use serde_json::Value;
use shared::password::hash_password;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const SECRET_KEY: &str = "integration-test-secret-key-0123456789";
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery";
pub const CLIENT_IP: &str = "8.8.8.8";

/// Test configuration: repository pages and static files, rate limiting off.
///
/// `overrides` are applied last and win over the test defaults.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");
    let pages_dir = format!("{}/pages", root);
    let static_dir = format!("{}/static", root);

    let mut all: Vec<(&str, &str)> = vec![
        ("database.url", "postgres://unused@localhost/unused"),
        ("security.secret_key", SECRET_KEY),
        ("security.rate_limit", ""),
        ("server.pages_dir", &pages_dir),
        ("server.static_dir", &static_dir),
    ];
    all.extend_from_slice(overrides);
    Config::from_defaults(&all).expect("test config")
}

/// Router plus the store behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    /// App with setup completed by an admin using [`ADMIN_PASSWORD`].
    pub async fn with_admin(config: Config) -> Self {
        let hash = hash_password(ADMIN_PASSWORD).expect("hash");
        let store = Arc::new(InMemoryStore::with_admin(ADMIN_USERNAME, &hash).await);
        Self::build(config, store, None)
    }

    /// App on an empty store; setup not yet done.
    pub fn fresh(config: Config) -> Self {
        Self::build(config, Arc::new(InMemoryStore::new()), None)
    }

    pub fn build(
        config: Config,
        store: Arc<InMemoryStore>,
        containers: Option<Arc<dyn ContainerRuntime>>,
    ) -> Self {
        let state = AppState::build(config, Stores::from_single(store.clone()), containers)
            .expect("app state");
        Self {
            router: create_app(state),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Fetch a CSRF token and its cookie.
    pub async fn csrf(&self, ip: &str) -> Csrf {
        let response = self
            .send(request(Method::GET, "/api/csrf-token", ip).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response, "coconut_csrf").expect("csrf cookie");
        let body = json_body(response).await;
        Csrf {
            token: body["csrf_token"].as_str().unwrap().to_string(),
            cookie,
        }
    }

    /// Log in as the admin and return the client's cookies.
    pub async fn login(&self, ip: &str) -> Client {
        let csrf = self.csrf(ip).await;
        let response = self
            .send(json_request(
                Method::POST,
                "/auth/login",
                ip,
                &[("cookie", format!("coconut_csrf={}", csrf.cookie)), ("x-csrftoken", csrf.token.clone())],
                serde_json::json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed");
        let session = set_cookie(&response, "coconut_session").expect("session cookie");
        Client {
            ip: ip.to_string(),
            csrf,
            session,
        }
    }
}

pub struct Csrf {
    pub token: String,
    pub cookie: String,
}

/// A logged-in browser.
pub struct Client {
    pub ip: String,
    pub csrf: Csrf,
    pub session: String,
}

impl Client {
    pub fn cookie_header(&self) -> String {
        format!(
            "coconut_csrf={}; coconut_session={}",
            self.csrf.cookie, self.session
        )
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        request(Method::GET, uri, &self.ip)
            .header(header::COOKIE, self.cookie_header())
            .body(Body::empty())
            .unwrap()
    }

    /// POST with session and CSRF token.
    pub fn post(&self, uri: &str, body: Value) -> Request<Body> {
        json_request(
            Method::POST,
            uri,
            &self.ip,
            &[
                ("cookie", self.cookie_header()),
                ("x-csrftoken", self.csrf.token.clone()),
            ],
            body,
        )
    }
}

/// Request builder carrying the peer address the server would see.
pub fn request(method: Method, uri: &str, ip: &str) -> axum::http::request::Builder {
    let peer = SocketAddr::new(ip.parse::<IpAddr>().unwrap(), 40_000);
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(peer))
}

pub fn get(uri: &str, ip: &str) -> Request<Body> {
    request(Method::GET, uri, ip).body(Body::empty()).unwrap()
}

pub fn json_request(
    method: Method,
    uri: &str,
    ip: &str,
    headers: &[(&str, String)],
    body: Value,
) -> Request<Body> {
    let mut builder = request(method, uri, ip).header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Value of the named cookie in the response's Set-Cookie headers.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    set_cookie_header(response, name).and_then(|cookie| {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
    })
}

/// Full Set-Cookie header for the named cookie.
pub fn set_cookie_header(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(str::to_string)
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn assert_security_headers(headers: &HeaderMap) {
    assert!(
        headers.contains_key("content-security-policy"),
        "missing Content-Security-Policy"
    );
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"), "missing X-Request-ID");
}

/// Container runtime double that records the calls it receives.
#[derive(Default)]
pub struct FakeRuntime {
    pub calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub const RUNNING_ID: &'static str = "c0ffee";

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn known(&self, id: &str) -> Result<(), ContainerError> {
        if id == Self::RUNNING_ID {
            Ok(())
        } else {
            Err(ContainerError::NotFound(id.to_string()))
        }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), ContainerError> {
        Ok(())
    }

    async fn version(&self) -> Result<RuntimeVersion, ContainerError> {
        Ok(RuntimeVersion {
            version: "24.0.7".to_string(),
            api_version: "1.43".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record(format!("list all={}", all));
        Ok(vec![ContainerSummary {
            id: Self::RUNNING_ID.to_string(),
            name: "web".to_string(),
            image: "nginx:latest".to_string(),
            state: "running".to_string(),
            status: "Up 2 hours".to_string(),
            created: 1_700_000_000,
        }])
    }

    async fn inspect(&self, id: &str) -> Result<ContainerDetails, ContainerError> {
        self.known(id)?;
        Ok(ContainerDetails {
            id: id.to_string(),
            name: "web".to_string(),
            image: "nginx:latest".to_string(),
            created: "2024-01-01T00:00:00Z".to_string(),
            state: ContainerState {
                status: "running".to_string(),
                running: true,
                exit_code: 0,
                started_at: Some("2024-01-01T00:00:01Z".to_string()),
                finished_at: None,
            },
            restart_count: 0,
        })
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.known(id)?;
        // Already running.
        Err(ContainerError::Api {
            status: 304,
            message: String::new(),
        })
    }

    async fn stop(&self, id: &str) -> Result<(), ContainerError> {
        self.known(id)?;
        self.record(format!("stop {}", id));
        Ok(())
    }

    async fn restart(&self, id: &str) -> Result<(), ContainerError> {
        self.known(id)?;
        self.record(format!("restart {}", id));
        Ok(())
    }

    async fn logs(&self, id: &str, tail: u32) -> Result<Vec<LogLine>, ContainerError> {
        self.known(id)?;
        self.record(format!("logs {} tail={}", id, tail));
        Ok(vec![
            LogLine {
                stream: LogStream::Stdout,
                line: "ready".to_string(),
            },
            LogLine {
                stream: LogStream::Stderr,
                line: "warning".to_string(),
            },
        ])
    }
}
