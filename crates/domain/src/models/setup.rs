//! First-run setup state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the initial administrative user has been created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupState {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SetupState {
    pub fn completed_now() -> Self {
        Self {
            completed: true,
            completed_at: Some(Utc::now()),
        }
    }
}
