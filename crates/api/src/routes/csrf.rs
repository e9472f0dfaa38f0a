//! CSRF token issuance.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::crypto::generate_token;

use crate::app::AppState;
use crate::services::{extract_cookie, CookieHelper, CSRF_COOKIE};

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// GET /api/csrf-token
///
/// Reuses the nonce in the client's CSRF cookie when it has one, otherwise
/// issues a new nonce and sets the cookie.
pub async fn csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = extract_cookie(&headers, CSRF_COOKIE)
        .filter(|nonce| nonce.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string);

    let nonce = existing.clone().unwrap_or_else(generate_token);
    let body = CsrfTokenResponse {
        csrf_token: state.csrf.issue(&nonce),
    };

    let mut response = Json(body).into_response();
    if existing.is_none() {
        CookieHelper::append(response.headers_mut(), &state.cookies.build_csrf_cookie(&nonce));
    }
    response
}
