//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod session;
pub mod setup_state;
pub mod user;

pub use session::SessionEntity;
pub use setup_state::SetupStateEntity;
pub use user::UserEntity;
