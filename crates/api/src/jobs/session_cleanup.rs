//! Expired session cleanup background job.

use domain::services::SessionStore;
use std::sync::Arc;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

/// Deletes sessions whose expiry has passed.
pub struct SessionCleanupJob {
    sessions: Arc<dyn SessionStore>,
}

impl SessionCleanupJob {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait::async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(15)
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .sessions
            .purge_expired()
            .await
            .map_err(|e| e.to_string())?;

        if deleted > 0 {
            info!(deleted, "Purged expired sessions");
        }
        Ok(())
    }
}
