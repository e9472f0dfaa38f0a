//! Session entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionEntity {
    pub token_hash: String,
    pub user_id: Uuid,
    pub logged_in: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl From<SessionEntity> for domain::models::Session {
    fn from(entity: SessionEntity) -> Self {
        Self {
            token_hash: entity.token_hash,
            user_id: entity.user_id,
            logged_in: entity.logged_in,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
            ip_address: entity.ip_address,
            user_agent: entity.user_agent,
        }
    }
}
