//! Login, logout and current-user routes.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use domain::models::User;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::ClientIp;
use crate::routes::pages::{serve_page, LOGIN_PAGE};
use crate::services::{
    extract_cookie, AuthError, AuthSession, ClientInfo, CookieHelper, SESSION_COOKIE,
};

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// GET /auth/login
pub async fn login_page(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve_page(&state.config.server.pages_dir, LOGIN_PAGE).await
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    client_ip: Option<Extension<ClientIp>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let client = ClientInfo {
        ip_address: client_ip
            .and_then(|Extension(ip)| ip.ip())
            .map(|ip| ip.to_string()),
        user_agent: user_agent.map(|TypedHeader(ua)| ua.as_str().to_string()),
    };

    let result = match state
        .auth
        .login(&request.username, &request.password, client)
        .await
    {
        Ok(result) => result,
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!(username = %request.username, "Failed login attempt");
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut response = Json(SessionResponse {
        logged_in: true,
        user: Some(result.user),
    })
    .into_response();
    CookieHelper::append(
        response.headers_mut(),
        &state.cookies.build_session_cookie(&result.token),
    );
    Ok(response)
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_cookie(&headers, SESSION_COOKIE) {
        state.auth.logout(token).await?;
    }

    let mut response = Json(SessionResponse {
        logged_in: false,
        user: None,
    })
    .into_response();
    CookieHelper::append(
        response.headers_mut(),
        &state.cookies.build_clear_session_cookie(),
    );
    Ok(response)
}

/// GET /auth/me
pub async fn me(session: AuthSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        logged_in: true,
        user: Some(session.user),
    })
}
