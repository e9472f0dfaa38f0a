//! Login session domain models.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A server-side login session.
///
/// The browser holds a random token; only its SHA-256 hash is stored.
#[derive(Debug, Clone)]
pub struct Session {
    pub token_hash: String,
    pub user_id: Uuid,
    pub logged_in: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Whether this session still authenticates its holder at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.logged_in && self.expires_at > now
    }
}

/// Data needed to create a session at login.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
