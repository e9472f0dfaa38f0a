//! Session-based authentication over the user and session stores.

use chrono::{Duration, Utc};
use domain::models::{NewSession, Session, User};
use domain::services::{SessionStore, StoreError, UserStore};
use shared::crypto::{generate_token, sha256_hex};
use shared::password::{verify_dummy, verify_password, PasswordError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// An authenticated request: the active session and its user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session: Session,
    pub user: User,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    /// Raw session token for the cookie. Only its hash is stored.
    pub token: String,
    pub session: Session,
}

/// Request metadata recorded with a new session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        session_ttl_secs: i64,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl: Duration::seconds(session_ttl_secs),
        }
    }

    /// Login with username and password, creating a new session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<LoginResult, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(PasswordError::UnsupportedHash) => {
                tracing::warn!(user_id = %user.id, "Stored password hash is not usable; login refused");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        }

        let now = Utc::now();
        let token = generate_token();
        let session = self
            .sessions
            .create(NewSession {
                token_hash: sha256_hex(&token),
                user_id: user.id,
                expires_at: now + self.session_ttl,
                ip_address: client.ip_address,
                user_agent: client.user_agent,
            })
            .await?;

        self.users.record_login(user.id, now).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(LoginResult {
            user: User {
                last_login_at: Some(now),
                ..user
            },
            token,
            session,
        })
    }

    /// Resolve a raw session token to an active session.
    ///
    /// Returns `None` for unknown, expired or logged-out sessions, and for
    /// sessions whose user no longer exists.
    pub async fn resolve(&self, token: &str) -> Result<Option<AuthSession>, StoreError> {
        let Some(session) = self.sessions.find_active(&sha256_hex(token)).await? else {
            return Ok(None);
        };

        if !session.is_active_at(Utc::now()) {
            return Ok(None);
        }

        Ok(self
            .users
            .find_by_id(session.user_id)
            .await?
            .map(|user| AuthSession { session, user }))
    }

    /// Destroy the session behind a raw token. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.delete(&sha256_hex(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::InMemoryStore;
    use shared::password::hash_password;

    async fn service_with_admin(ttl: i64) -> (AuthService, Arc<InMemoryStore>) {
        let hash = hash_password("correct horse").unwrap();
        let store = Arc::new(InMemoryStore::with_admin("admin", &hash).await);
        let service = AuthService::new(store.clone(), store.clone(), ttl);
        (service, store)
    }

    #[tokio::test]
    async fn test_login_and_resolve() {
        let (service, _store) = service_with_admin(3600).await;

        let result = service
            .login("admin", "correct horse", ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(result.user.username, "admin");
        assert!(result.user.last_login_at.is_some());
        assert_ne!(result.session.token_hash, result.token);

        let resolved = service.resolve(&result.token).await.unwrap().unwrap();
        assert_eq!(resolved.user.id, result.user.id);
        assert!(resolved.session.logged_in);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (service, _store) = service_with_admin(3600).await;
        let err = service
            .login("admin", "wrong", ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let (service, _store) = service_with_admin(3600).await;
        let err = service
            .login("nobody", "correct horse", ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let (service, _store) = service_with_admin(3600).await;
        let result = service
            .login("admin", "correct horse", ClientInfo::default())
            .await
            .unwrap();

        service.logout(&result.token).await.unwrap();
        assert!(service.resolve(&result.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_not_resolved() {
        let (service, _store) = service_with_admin(-1).await;
        let result = service
            .login("admin", "correct horse", ClientInfo::default())
            .await
            .unwrap();
        assert!(service.resolve(&result.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_unknown_token() {
        let (service, _store) = service_with_admin(3600).await;
        assert!(service.resolve("not-a-token").await.unwrap().is_none());
    }
}
