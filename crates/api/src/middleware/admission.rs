//! Runs the admission pipeline in front of every route.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::admission::AdmissionContext;
use crate::app::AppState;
use crate::middleware::client_ip::ClientIp;

/// Evaluates the admission gates; a terminating gate's response is returned
/// without calling the handler.
///
/// On success the resolved [`ClientIp`] and, when present, the
/// [`AuthSession`](crate::services::AuthSession) are stored in request
/// extensions.
pub async fn admission_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let client_ip = ClientIp::from_parts(&parts, state.config.security.trust_proxy_headers);

    let session = {
        let mut ctx = AdmissionContext::new(
            &parts.method,
            parts.uri.path(),
            &parts.headers,
            client_ip.ip(),
        );
        if let Some(response) = state.admission.run(&mut ctx).await {
            return response;
        }
        ctx.session
    };

    parts.extensions.insert(client_ip);
    if let Some(session) = session {
        parts.extensions.insert(session);
    }

    next.run(Request::from_parts(parts, body)).await
}
