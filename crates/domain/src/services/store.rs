use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewSession, NewUser, Session, SetupState, User};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// All users ordered by creation time.
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Insert a user. Fails with [`StoreError::Conflict`] if the username is taken.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: NewSession) -> StoreResult<Session>;

    /// Look up a session that is logged in and not yet expired.
    async fn find_active(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    async fn delete(&self, token_hash: &str) -> StoreResult<()>;

    /// Remove expired sessions, returning how many were deleted.
    async fn purge_expired(&self) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait SetupStore: Send + Sync {
    async fn state(&self) -> StoreResult<SetupState>;

    /// Create the first admin and mark setup complete in one step.
    ///
    /// Fails with [`StoreError::Conflict`] if setup was already completed.
    async fn complete_with_admin(&self, admin: NewUser) -> StoreResult<User>;

    /// Mark setup complete without creating a user (used by restore).
    async fn mark_complete(&self) -> StoreResult<SetupState>;
}

#[async_trait::async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}
