//! Backup download and restore routes.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use domain::models::{BackupDocument, RestoreSummary};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{backup, AuthSession};

/// Backups carry password hashes, so only administrators may move them.
fn require_admin(session: &AuthSession) -> Result<(), ApiError> {
    if session.user.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Administrator access required".to_string()))
    }
}

/// GET /api/backup
pub async fn download_backup(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Response, ApiError> {
    require_admin(&session)?;

    let doc = backup::export(state.stores.users.as_ref(), state.stores.setup.as_ref()).await?;
    let filename = format!("coconut-backup-{}.json", Utc::now().format("%Y%m%d_%H%M%S"));

    tracing::info!(user_id = %session.user.id, users = doc.users.len(), "Backup exported");

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )],
        Json(doc),
    )
        .into_response())
}

/// POST /api/backup/restore
pub async fn restore_backup(
    State(state): State<AppState>,
    session: AuthSession,
    Json(doc): Json<BackupDocument>,
) -> Result<Json<RestoreSummary>, ApiError> {
    require_admin(&session)?;

    let summary = backup::restore(
        state.stores.users.as_ref(),
        state.stores.setup.as_ref(),
        doc,
    )
    .await?;
    Ok(Json(summary))
}
