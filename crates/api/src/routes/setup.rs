//! First-run setup: create the initial administrator or restore a backup.

use axum::{extract::State, http::StatusCode, response::Response, Json};
use domain::models::{BackupDocument, NewUser, RestoreSummary, User};
use serde::{Deserialize, Serialize};
use shared::password::hash_password;
use validator::Validate;

use crate::admission::found;
use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::pages::{serve_page, SETUP_PAGE};
use crate::services::backup;

/// Request body for `POST /setup/admin`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,

    #[validate(custom(function = "shared::validation::validate_password_strength"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub setup_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateAdminResponse {
    pub setup_complete: bool,
    pub user: User,
}

/// GET /setup
pub async fn setup_root() -> Response {
    found("/setup/start")
}

/// GET /setup/start
///
/// Sends already set-up instances back to the index.
pub async fn setup_start(State(state): State<AppState>) -> Result<Response, ApiError> {
    if state.stores.setup.state().await?.completed {
        return Ok(found("/"));
    }
    serve_page(&state.config.server.pages_dir, SETUP_PAGE).await
}

/// GET /setup/status
pub async fn setup_status(
    State(state): State<AppState>,
) -> Result<Json<SetupStatusResponse>, ApiError> {
    let setup = state.stores.setup.state().await?;
    Ok(Json(SetupStatusResponse {
        setup_complete: setup.completed,
    }))
}

/// POST /setup/admin
pub async fn create_admin(
    State(state): State<AppState>,
    Json(request): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<CreateAdminResponse>), ApiError> {
    request.validate()?;

    if state.stores.setup.state().await?.completed {
        return Err(ApiError::Conflict("Setup has already been completed".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let user = state
        .stores
        .setup
        .complete_with_admin(NewUser::admin(request.username, password_hash))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Initial administrator created");

    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            setup_complete: true,
            user,
        }),
    ))
}

/// POST /setup/restore
///
/// Seeds a fresh instance from a backup instead of creating an admin by hand.
/// The backup must contain an administrator.
pub async fn restore_from_backup(
    State(state): State<AppState>,
    Json(doc): Json<BackupDocument>,
) -> Result<Json<RestoreSummary>, ApiError> {
    if state.stores.setup.state().await?.completed {
        return Err(ApiError::Conflict("Setup has already been completed".to_string()));
    }
    if !doc.users.iter().any(|user| user.is_admin) {
        return Err(ApiError::Validation(
            "Backup does not contain an administrator".to_string(),
        ));
    }

    let summary = backup::restore(
        state.stores.users.as_ref(),
        state.stores.setup.as_ref(),
        doc,
    )
    .await?;
    if !summary.setup_completed {
        return Err(ApiError::Validation(
            "No administrator in the backup could be imported".to_string(),
        ));
    }

    tracing::info!(imported = summary.imported, "Setup completed from backup");
    Ok(Json(summary))
}
