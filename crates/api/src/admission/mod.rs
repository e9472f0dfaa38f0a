//! Request admission pipeline.
//!
//! Every request passes an ordered list of [`Gate`]s before reaching a route
//! handler: IP blacklist, IP whitelist, setup-required, login-required and
//! CSRF. The first gate that terminates decides the response and no later
//! gate runs.

mod csrf;
mod ip;
mod login;
mod paths;
mod setup;

pub use csrf::CsrfGate;
pub use ip::{load_ip_lists, BlacklistGate, WhitelistGate};
pub use login::LoginGate;
pub use paths::ExemptPaths;
pub use setup::SetupGate;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::IpAddr;

use crate::error::ApiError;
use crate::services::AuthSession;

/// Request data visible to gates.
#[derive(Debug)]
pub struct AdmissionContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub client_ip: Option<IpAddr>,
    /// Set by the login gate once an active session is found.
    pub session: Option<AuthSession>,
}

impl<'a> AdmissionContext<'a> {
    pub fn new(
        method: &'a Method,
        path: &'a str,
        headers: &'a HeaderMap,
        client_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            client_ip,
            session: None,
        }
    }

    /// CORS preflight; carries no credentials.
    pub fn is_preflight(&self) -> bool {
        self.method == Method::OPTIONS
    }

    pub fn is_api_request(&self) -> bool {
        self.path == "/api" || self.path.starts_with("/api/")
    }
}

#[derive(Debug)]
pub enum GateOutcome {
    Continue,
    Terminate(Response),
}

#[async_trait::async_trait]
pub trait Gate: Send + Sync {
    /// Label used in logs and the rejection counter.
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError>;
}

/// Ordered gate chain.
#[derive(Default)]
pub struct AdmissionPipeline {
    gates: Vec<Box<dyn Gate>>,
}

impl std::fmt::Debug for AdmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.gates.iter().map(|g| g.name()))
            .finish()
    }
}

impl AdmissionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gate(mut self, gate: impl Gate + 'static) -> Self {
        self.gates.push(Box::new(gate));
        self
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Run all gates in order. Returns the terminal response of the first gate
    /// that rejects, or `None` when the request may proceed.
    pub async fn run(&self, ctx: &mut AdmissionContext<'_>) -> Option<Response> {
        for gate in &self.gates {
            let response = match gate.evaluate(ctx).await {
                Ok(GateOutcome::Continue) => continue,
                Ok(GateOutcome::Terminate(response)) => response,
                Err(err) => {
                    tracing::warn!(gate = gate.name(), error = %err, "Admission gate failed");
                    err.into_response()
                }
            };

            tracing::debug!(
                gate = gate.name(),
                method = %ctx.method,
                path = %ctx.path,
                status = response.status().as_u16(),
                "Request stopped by admission gate"
            );
            metrics::counter!("admission_rejections_total", "gate" => gate.name()).increment(1);
            return Some(response);
        }
        None
    }
}

/// `302 Found` redirect to `location`.
pub(crate) fn found(location: &'static str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, HeaderValue::from_static(location))],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        name: &'static str,
        status: Option<StatusCode>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Gate for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn evaluate(&self, _ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match self.status {
                Some(status) => GateOutcome::Terminate(status.into_response()),
                None => GateOutcome::Continue,
            })
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Gate for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn evaluate(&self, _ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
            Err(ApiError::Internal("store down".into()))
        }
    }

    fn gate(name: &'static str, status: Option<StatusCode>, calls: &Arc<AtomicUsize>) -> Fixed {
        Fixed {
            name,
            status,
            calls: calls.clone(),
        }
    }

    #[tokio::test]
    async fn test_all_gates_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = AdmissionPipeline::new()
            .with_gate(gate("a", None, &calls))
            .with_gate(gate("b", None, &calls));

        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(&Method::GET, "/", &headers, None);
        assert!(pipeline.run(&mut ctx).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_terminating_gate_short_circuits() {
        let first = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let pipeline = AdmissionPipeline::new()
            .with_gate(gate("pass", None, &first))
            .with_gate(gate("reject", Some(StatusCode::FORBIDDEN), &first))
            .with_gate(gate("redirect", Some(StatusCode::FOUND), &later));

        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(&Method::GET, "/", &headers, None);
        let response = pipeline.run(&mut ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gate_error_becomes_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = AdmissionPipeline::new()
            .with_gate(Failing)
            .with_gate(gate("after", None, &calls));

        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(&Method::GET, "/", &headers, None);
        let response = pipeline.run(&mut ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_gate_names_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = AdmissionPipeline::new()
            .with_gate(gate("one", None, &calls))
            .with_gate(gate("two", None, &calls));
        assert_eq!(pipeline.gate_names(), vec!["one", "two"]);
    }

    #[test]
    fn test_api_request_detection() {
        let headers = HeaderMap::new();
        for (path, expected) in [
            ("/api", true),
            ("/api/system_info", true),
            ("/apiary", false),
            ("/", false),
        ] {
            let ctx = AdmissionContext::new(&Method::GET, path, &headers, None);
            assert_eq!(ctx.is_api_request(), expected, "{}", path);
        }
    }

    #[test]
    fn test_found_redirect() {
        let response = found("/setup");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/setup");
    }
}
