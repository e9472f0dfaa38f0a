//! Backup export and restore over the store traits.

use domain::models::{BackupDocument, NewUser, RestoreSummary, BACKUP_FORMAT_VERSION};
use domain::services::{SetupStore, StoreError, UserStore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Unsupported backup format version {0}")]
    UnsupportedVersion(u32),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Snapshot all users and the setup state.
pub async fn export(
    users: &dyn UserStore,
    setup: &dyn SetupStore,
) -> Result<BackupDocument, StoreError> {
    let state = setup.state().await?;
    let all = users.list().await?;
    Ok(BackupDocument::new(env!("CARGO_PKG_VERSION"), state, all))
}

/// Import the users of `doc`.
///
/// Users are skipped when the username already exists or fails validation,
/// or when the password hash is not one this build can verify.
/// Importing at least one admin into an instance that has not completed
/// setup marks setup complete.
pub async fn restore(
    users: &dyn UserStore,
    setup: &dyn SetupStore,
    doc: BackupDocument,
) -> Result<RestoreSummary, BackupError> {
    if doc.format_version == 0 || doc.format_version > BACKUP_FORMAT_VERSION {
        return Err(BackupError::UnsupportedVersion(doc.format_version));
    }

    let mut summary = RestoreSummary::default();
    let mut imported_admin = false;

    for user in doc.users {
        if shared::validation::validate_username(&user.username).is_err()
            || !shared::password::is_supported_hash(&user.password_hash)
        {
            tracing::warn!(username = %user.username, "Skipping invalid user in backup");
            summary.skipped += 1;
            continue;
        }

        if users.find_by_username(&user.username).await?.is_some() {
            summary.skipped += 1;
            continue;
        }

        match users
            .insert(NewUser {
                username: user.username,
                password_hash: user.password_hash,
                is_admin: user.is_admin,
            })
            .await
        {
            Ok(created) => {
                imported_admin |= created.is_admin;
                summary.imported += 1;
            }
            Err(StoreError::Conflict(_)) => summary.skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    if imported_admin && !setup.state().await?.completed {
        setup.mark_complete().await?;
        summary.setup_completed = true;
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        setup_completed = summary.setup_completed,
        "Backup restored"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{BackupUser, SetupState};
    use domain::services::InMemoryStore;
    use shared::password::hash_password;
    use uuid::Uuid;

    fn backup_user(username: &str, is_admin: bool) -> BackupUser {
        BackupUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password("restored-password").unwrap(),
            is_admin,
            created_at: Utc::now(),
        }
    }

    fn document(users: Vec<BackupUser>) -> BackupDocument {
        BackupDocument {
            format_version: BACKUP_FORMAT_VERSION,
            app_version: "0.1.0".to_string(),
            created_at: Utc::now(),
            setup: SetupState::completed_now(),
            users,
        }
    }

    #[tokio::test]
    async fn test_export_includes_users_and_setup() {
        let store = InMemoryStore::with_admin("admin", "$argon2id$hash").await;

        let doc = export(&store, &store).await.unwrap();
        assert!(doc.setup.completed);
        assert_eq!(doc.users.len(), 1);
        assert_eq!(doc.users[0].password_hash, "$argon2id$hash");
    }

    #[tokio::test]
    async fn test_restore_skips_existing_usernames() {
        let store = InMemoryStore::with_admin("admin", "$argon2id$hash").await;
        let doc = document(vec![backup_user("admin", true), backup_user("operator", false)]);

        let summary = restore(&store, &store, doc).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.setup_completed);

        let existing = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(existing.password_hash, "$argon2id$hash");
    }

    #[tokio::test]
    async fn test_restore_admin_completes_setup() {
        let store = InMemoryStore::new();
        let doc = document(vec![backup_user("admin", true)]);

        let summary = restore(&store, &store, doc).await.unwrap();
        assert!(summary.setup_completed);
        assert!(store.state().await.unwrap().completed);
    }

    #[tokio::test]
    async fn test_restore_non_admin_leaves_setup_pending() {
        let store = InMemoryStore::new();
        let doc = document(vec![backup_user("viewer", false)]);

        let summary = restore(&store, &store, doc).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert!(!summary.setup_completed);
        assert!(!store.state().await.unwrap().completed);
    }

    #[tokio::test]
    async fn test_restore_rejects_unknown_format() {
        let store = InMemoryStore::new();
        let mut doc = document(vec![]);
        doc.format_version = BACKUP_FORMAT_VERSION + 1;

        assert!(matches!(
            restore(&store, &store, doc).await,
            Err(BackupError::UnsupportedVersion(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_skips_invalid_usernames() {
        let store = InMemoryStore::new();
        let doc = document(vec![backup_user("no spaces allowed", true)]);

        let summary = restore(&store, &store, doc).await.unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_restore_skips_foreign_hashes() {
        let store = InMemoryStore::new();
        let mut user = backup_user("legacy", true);
        user.password_hash = "pbkdf2:sha256:260000$salt$abcdef".to_string();

        let summary = restore(&store, &store, document(vec![user])).await.unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 1);
        assert!(!store.state().await.unwrap().completed);
    }
}
