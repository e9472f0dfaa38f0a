use axum::http::Method;
use axum::response::IntoResponse;

use super::{AdmissionContext, ExemptPaths, Gate, GateOutcome};
use crate::error::ApiError;
use crate::services::{extract_cookie, CsrfError, CsrfTokens, CSRF_COOKIE};

/// Headers a client may carry the CSRF token in.
pub const CSRF_HEADERS: &[&str] = &["x-csrftoken", "x-csrf-token"];

/// Requires a valid CSRF token on state-changing requests.
pub struct CsrfGate {
    tokens: CsrfTokens,
    exempt: ExemptPaths,
}

impl CsrfGate {
    pub fn new(tokens: CsrfTokens, exempt: ExemptPaths) -> Self {
        Self { tokens, exempt }
    }

    fn check(&self, ctx: &AdmissionContext<'_>) -> Result<(), CsrfError> {
        let token = CSRF_HEADERS
            .iter()
            .find_map(|name| ctx.headers.get(*name))
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(CsrfError::Missing)?;
        let nonce = extract_cookie(ctx.headers, CSRF_COOKIE).ok_or(CsrfError::MissingCookie)?;
        self.tokens.verify(token, nonce)
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

#[async_trait::async_trait]
impl Gate for CsrfGate {
    fn name(&self) -> &'static str {
        "csrf"
    }

    async fn evaluate(&self, ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
        if is_safe_method(ctx.method) || self.exempt.matches(ctx.path) {
            return Ok(GateOutcome::Continue);
        }

        match self.check(ctx) {
            Ok(()) => Ok(GateOutcome::Continue),
            Err(err) => {
                tracing::info!(path = %ctx.path, reason = %err, "CSRF check failed");
                Ok(GateOutcome::Terminate(
                    ApiError::Csrf(err.to_string()).into_response(),
                ))
            }
        }
    }
}
