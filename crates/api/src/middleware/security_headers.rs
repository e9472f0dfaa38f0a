//! Security headers middleware.
//!
//! Adds the security headers to every response, including responses produced
//! by rejecting gates, the rate limiter and the fallback handler.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{Config, ConfigValidationError};

/// Header values resolved once at startup.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    content_security_policy: HeaderValue,
    frame_options: HeaderValue,
}

impl SecurityHeaders {
    pub fn from_config(config: &Config) -> Result<Self, ConfigValidationError> {
        let content_security_policy =
            HeaderValue::from_str(config.security.content_security_policy.trim()).map_err(|_| {
                ConfigValidationError::InvalidValue(
                    "content_security_policy is not a valid header value".to_string(),
                )
            })?;

        Ok(Self {
            content_security_policy,
            frame_options: HeaderValue::from_static(config.frame_options()?),
        })
    }

    pub fn apply(&self, response: &mut Response) {
        let headers = response.headers_mut();

        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            self.content_security_policy.clone(),
        );

        // Prevent MIME type sniffing
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );

        // Clickjacking protection
        headers.insert(header::X_FRAME_OPTIONS, self.frame_options.clone());
    }
}

/// Middleware that adds security headers to all responses.
pub async fn security_headers_middleware(
    State(headers): State<Arc<SecurityHeaders>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    headers.apply(&mut response);
    response
}
