use axum::response::IntoResponse;

use super::{found, AdmissionContext, ExemptPaths, Gate, GateOutcome};
use crate::error::ApiError;
use crate::services::{extract_cookie, AuthService, SESSION_COOKIE};

/// Requires an active session outside the exempt paths.
///
/// Page requests are redirected to the login page; API requests get 401.
/// On success the session is attached to the admission context.
pub struct LoginGate {
    auth: AuthService,
    exempt: ExemptPaths,
}

impl LoginGate {
    pub fn new(auth: AuthService, exempt: ExemptPaths) -> Self {
        Self { auth, exempt }
    }
}

#[async_trait::async_trait]
impl Gate for LoginGate {
    fn name(&self) -> &'static str {
        "login_required"
    }

    async fn evaluate(&self, ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
        if ctx.is_preflight() || self.exempt.matches(ctx.path) {
            return Ok(GateOutcome::Continue);
        }

        if let Some(token) = extract_cookie(ctx.headers, SESSION_COOKIE) {
            if let Some(session) = self.auth.resolve(token).await? {
                ctx.session = Some(session);
                return Ok(GateOutcome::Continue);
            }
        }

        if ctx.is_api_request() {
            return Ok(GateOutcome::Terminate(
                ApiError::Unauthorized("Authentication required".into()).into_response(),
            ));
        }
        Ok(GateOutcome::Terminate(found("/auth/login")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ClientInfo;
    use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
    use domain::services::InMemoryStore;
    use shared::password::hash_password;
    use std::sync::Arc;

    async fn setup() -> (LoginGate, AuthService) {
        let hash = hash_password("correct horse").unwrap();
        let store = Arc::new(InMemoryStore::with_admin("admin", &hash).await);
        let auth = AuthService::new(store.clone(), store, 3600);
        let gate = LoginGate::new(
            auth.clone(),
            ExemptPaths::new(["/auth/login", "/api/health"]),
        );
        (gate, auth)
    }

    fn cookie(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
        );
        headers
    }

    fn status(outcome: &GateOutcome) -> Option<StatusCode> {
        match outcome {
            GateOutcome::Continue => None,
            GateOutcome::Terminate(response) => Some(response.status()),
        }
    }

    #[tokio::test]
    async fn test_page_request_redirects_to_login() {
        let (gate, _) = setup().await;
        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(&Method::GET, "/", &headers, None);
        let outcome = gate.evaluate(&mut ctx).await.unwrap();
        match outcome {
            GateOutcome::Terminate(response) => {
                assert_eq!(response.status(), StatusCode::FOUND);
                assert_eq!(response.headers()[header::LOCATION], "/auth/login");
            }
            GateOutcome::Continue => panic!("expected redirect"),
        }
    }

    #[tokio::test]
    async fn test_api_request_unauthorized() {
        let (gate, _) = setup().await;
        let headers = cookie("bogus");
        let mut ctx = AdmissionContext::new(&Method::GET, "/api/system_info", &headers, None);
        let outcome = gate.evaluate(&mut ctx).await.unwrap();
        assert_eq!(status(&outcome), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_exempt_path_passes() {
        let (gate, _) = setup().await;
        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(&Method::POST, "/auth/login", &headers, None);
        let outcome = gate.evaluate(&mut ctx).await.unwrap();
        assert_eq!(status(&outcome), None);
        assert!(ctx.session.is_none());
    }

    #[tokio::test]
    async fn test_active_session_attached() {
        let (gate, auth) = setup().await;
        let login = auth
            .login("admin", "correct horse", ClientInfo::default())
            .await
            .unwrap();

        let headers = cookie(&login.token);
        let mut ctx = AdmissionContext::new(&Method::GET, "/api/system_info", &headers, None);
        let outcome = gate.evaluate(&mut ctx).await.unwrap();
        assert_eq!(status(&outcome), None);
        assert_eq!(ctx.session.unwrap().user.username, "admin");
    }

    #[tokio::test]
    async fn test_logged_out_session_rejected() {
        let (gate, auth) = setup().await;
        let login = auth
            .login("admin", "correct horse", ClientInfo::default())
            .await
            .unwrap();
        auth.logout(&login.token).await.unwrap();

        let headers = cookie(&login.token);
        let mut ctx = AdmissionContext::new(&Method::GET, "/", &headers, None);
        let outcome = gate.evaluate(&mut ctx).await.unwrap();
        assert_eq!(status(&outcome), Some(StatusCode::FOUND));
    }
}
