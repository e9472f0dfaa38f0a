//! Setup state entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the single-row setup_state table.
#[derive(Debug, Clone, FromRow)]
pub struct SetupStateEntity {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SetupStateEntity> for domain::models::SetupState {
    fn from(entity: SetupStateEntity) -> Self {
        Self {
            completed: entity.completed,
            completed_at: entity.completed_at,
        }
    }
}
