//! Repository implementations for database operations.

pub mod health;
pub mod session;
pub mod setup;
pub mod user;

pub use health::PoolHealth;
pub use session::SessionRepository;
pub use setup::SetupRepository;
pub use user::UserRepository;

use domain::services::StoreError;

/// PostgreSQL unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a sqlx error onto the domain store error.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(db_err.message().to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_pool_timeout_maps_to_backend() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Backend(_)
        ));
    }
}
