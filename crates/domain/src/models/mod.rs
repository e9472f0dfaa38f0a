//! Domain models for Coconut.

pub mod backup;
pub mod session;
pub mod setup;
pub mod user;

pub use backup::{BackupDocument, BackupUser, RestoreSummary, BACKUP_FORMAT_VERSION};
pub use session::{NewSession, Session};
pub use setup::SetupState;
pub use user::{NewUser, User};
