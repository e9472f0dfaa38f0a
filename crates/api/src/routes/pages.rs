//! Static HTML pages and the JSON 404 fallback.

use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Response},
};
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;

pub const INDEX_PAGE: &str = "index.html";
pub const LOGIN_PAGE: &str = "login.html";
pub const SETUP_PAGE: &str = "setup.html";

/// Read a page from the pages directory.
pub async fn serve_page(pages_dir: &str, name: &str) -> Result<Response, ApiError> {
    let path = Path::new(pages_dir).join(name);
    match fs::read_to_string(&path).await {
        Ok(contents) => Ok(Html(contents).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Page not found on disk");
            Err(ApiError::NotFound(format!("Page {} not found", name)))
        }
        Err(e) => Err(ApiError::Internal(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve_page(&state.config.server.pages_dir, INDEX_PAGE).await
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
