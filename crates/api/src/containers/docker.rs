//! Docker Engine API client over a Unix socket or TCP.
//!
//! Each call opens one HTTP/1 connection with hyper, sends a single request
//! and reads the whole response.

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use super::models::{
    decode_logs, ContainerDetails, ContainerSummary, EngineContainer, EngineInspect, LogLine,
    RuntimeVersion,
};
use super::{ContainerError, ContainerRuntime};

/// Largest response body read from the engine.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Seconds the engine waits for a container to stop before killing it.
const STOP_TIMEOUT_SECS: u64 = 10;

lazy_static! {
    static ref CONTAINER_ID: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("container id pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    fn parse(host: &str) -> Result<Self, ContainerError> {
        let host = host.trim();
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ContainerError::InvalidHost(host.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        let authority = host
            .strip_prefix("tcp://")
            .or_else(|| host.strip_prefix("http://"))
            .ok_or_else(|| ContainerError::InvalidHost(host.to_string()))?
            .trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return Err(ContainerError::InvalidHost(host.to_string()));
        }
        Ok(Endpoint::Tcp(authority.to_string()))
    }

    fn host_header(&self) -> &str {
        match self {
            // The engine ignores the host on socket connections.
            Endpoint::Unix(_) => "docker",
            Endpoint::Tcp(authority) => authority,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    endpoint: Endpoint,
    timeout: Duration,
}

impl DockerClient {
    /// Create a client for `host` (`unix:///var/run/docker.sock` or `tcp://host:port`).
    pub fn new(host: &str, timeout: Duration) -> Result<Self, ContainerError> {
        Ok(Self {
            endpoint: Endpoint::parse(host)?,
            timeout,
        })
    }

    async fn request(&self, method: Method, path: &str) -> Result<(StatusCode, Bytes), ContainerError> {
        tokio::time::timeout(self.timeout, self.send(method, path))
            .await
            .map_err(|_| ContainerError::Timeout(self.timeout.as_secs()))?
    }

    async fn send(&self, method: Method, path: &str) -> Result<(StatusCode, Bytes), ContainerError> {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, self.endpoint.host_header())
            .body(Body::empty())
            .map_err(|e| ContainerError::Connection(e.to_string()))?;

        match &self.endpoint {
            Endpoint::Unix(path) => send_unix(path, req).await,
            Endpoint::Tcp(authority) => {
                let stream = tokio::net::TcpStream::connect(authority)
                    .await
                    .map_err(|e| ContainerError::Connection(e.to_string()))?;
                send_over(stream, req).await
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, id: Option<&str>) -> Result<T, ContainerError> {
        let (status, body) = self.request(Method::GET, path).await?;
        let body = check_status(status, body, id)?;
        serde_json::from_slice(&body).map_err(|e| ContainerError::Decode(e.to_string()))
    }

    async fn post_action(&self, id: &str, action: &str, query: &str) -> Result<(), ContainerError> {
        let id = validate_id(id)?;
        let path = format!("/containers/{}/{}{}", id, action, query);
        let (status, body) = self.request(Method::POST, &path).await?;
        check_status(status, body, Some(id))?;
        tracing::info!(container = %id, action = action, "Container action completed");
        Ok(())
    }
}

#[cfg(unix)]
async fn send_unix(path: &std::path::Path, req: Request<Body>) -> Result<(StatusCode, Bytes), ContainerError> {
    let stream = tokio::net::UnixStream::connect(path)
        .await
        .map_err(|e| ContainerError::Connection(format!("{}: {}", path.display(), e)))?;
    send_over(stream, req).await
}

#[cfg(not(unix))]
async fn send_unix(path: &std::path::Path, _req: Request<Body>) -> Result<(StatusCode, Bytes), ContainerError> {
    Err(ContainerError::Connection(format!(
        "Unix sockets are not supported on this platform: {}",
        path.display()
    )))
}

async fn send_over<S>(stream: S, req: Request<Body>) -> Result<(StatusCode, Bytes), ContainerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| ContainerError::Connection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "Docker connection closed with error");
        }
    });

    let response = sender
        .send_request(req)
        .await
        .map_err(|e| ContainerError::Connection(e.to_string()))?;

    let status = response.status();
    let body = to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
        .await
        .map_err(|e| ContainerError::Connection(e.to_string()))?;
    Ok((status, body))
}

/// Map engine status codes to errors. 304 (already started/stopped) is an error
/// so callers can report it.
fn check_status(status: StatusCode, body: Bytes, id: Option<&str>) -> Result<Bytes, ContainerError> {
    if status.is_success() {
        return Ok(body);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(ContainerError::NotFound(id.to_string()));
        }
    }

    let message = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());

    Err(ContainerError::Api {
        status: status.as_u16(),
        message,
    })
}

fn validate_id(id: &str) -> Result<&str, ContainerError> {
    if CONTAINER_ID.is_match(id) {
        Ok(id)
    } else {
        Err(ContainerError::InvalidId(id.to_string()))
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerClient {
    async fn ping(&self) -> Result<(), ContainerError> {
        let (status, body) = self.request(Method::GET, "/_ping").await?;
        check_status(status, body, None)?;
        Ok(())
    }

    async fn version(&self) -> Result<RuntimeVersion, ContainerError> {
        self.get_json("/version", None).await
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, ContainerError> {
        let path = format!("/containers/json?all={}", all);
        let containers: Vec<EngineContainer> = self.get_json(&path, None).await?;
        Ok(containers.into_iter().map(Into::into).collect())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerDetails, ContainerError> {
        let id = validate_id(id)?;
        let path = format!("/containers/{}/json", id);
        let details: EngineInspect = self.get_json(&path, Some(id)).await?;
        Ok(details.into())
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.post_action(id, "start", "").await
    }

    async fn stop(&self, id: &str) -> Result<(), ContainerError> {
        self.post_action(id, "stop", &format!("?t={}", STOP_TIMEOUT_SECS))
            .await
    }

    async fn restart(&self, id: &str) -> Result<(), ContainerError> {
        self.post_action(id, "restart", &format!("?t={}", STOP_TIMEOUT_SECS))
            .await
    }

    async fn logs(&self, id: &str, tail: u32) -> Result<Vec<LogLine>, ContainerError> {
        let id = validate_id(id)?;
        let path = format!("/containers/{}/logs?stdout=true&stderr=true&tail={}", id, tail);
        let (status, body) = self.request(Method::GET, &path).await?;
        let body = check_status(status, body, Some(id))?;
        Ok(decode_logs(&body))
    }
}
