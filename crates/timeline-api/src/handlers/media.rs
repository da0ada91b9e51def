//! Media record deletion and shared file cleanup

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use timeline_core::AppError;
use timeline_processing::{DeletionReport, RegistryError};

use crate::error::HttpAppError;
use crate::state::AppState;

/// Remove the files behind `urls`, each with its whole derivative chain.
///
/// URLs that do not name a stored upload are skipped.
pub(crate) async fn remove_files_for_urls(
    state: &AppState,
    urls: &[String],
) -> Result<Vec<DeletionReport>, HttpAppError> {
    let mut reports = Vec::new();
    for url in urls {
        let Some(name) = state.media.storage.name_from_url(url) else {
            tracing::debug!(url = %url, "Not an uploaded file, nothing to remove");
            continue;
        };
        match state.media.registry.delete_logical_file(name).await {
            Ok(report) => reports.push(report),
            Err(RegistryError::InvalidName(name)) => {
                tracing::warn!(url = %url, name = %name, "Skipping media URL with unsafe name");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(reports)
}

/// Delete a media record together with the served file and its derivatives
#[tracing::instrument(skip(state))]
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeletionReport>, HttpAppError> {
    let report = state
        .media
        .registry
        .delete_record(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;

    Ok(Json(report))
}
