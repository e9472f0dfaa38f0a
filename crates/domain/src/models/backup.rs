//! Backup document format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SetupState, User};

/// Current backup document format version.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// A user as written to a backup, including the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for BackupUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Full application backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub format_version: u32,
    pub app_version: String,
    pub created_at: DateTime<Utc>,
    pub setup: SetupState,
    pub users: Vec<BackupUser>,
}

impl BackupDocument {
    pub fn new(app_version: &str, setup: SetupState, users: Vec<User>) -> Self {
        Self {
            format_version: BACKUP_FORMAT_VERSION,
            app_version: app_version.to_string(),
            created_at: Utc::now(),
            setup,
            users: users.into_iter().map(BackupUser::from).collect(),
        }
    }
}

/// Outcome of restoring a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub imported: usize,
    pub skipped: usize,
    pub setup_completed: bool,
}
