//! Message units attached to an occurrence or span

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use timeline_core::models::{CreateInstanceRequest, InstanceResponse};
use timeline_core::{AppError, MediaRecordStore};
use validator::Validate;

use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::media::remove_files_for_urls;
use crate::handlers::occurrences::resolve_target;
use crate::state::AppState;

#[tracing::instrument(skip(state, request), fields(file_count = request.files.len()))]
pub async fn create_instance(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<CreateInstanceRequest>,
) -> Result<(StatusCode, Json<InstanceResponse>), HttpAppError> {
    request.validate().map_err(AppError::from)?;
    if request.is_empty() {
        return Err(AppError::InvalidInput(
            "An instance needs a message or at least one file".to_string(),
        )
        .into());
    }

    let target = resolve_target(&state, item_id).await?;

    // attachments must be files this server stored
    for file in &request.files {
        let stored = match state.media.storage.name_from_url(&file.url) {
            Some(name) => state.media.storage.exists(name).await.unwrap_or(false),
            None => false,
        };
        if !stored {
            return Err(
                AppError::InvalidInput(format!("Unknown uploaded file: {}", file.url)).into(),
            );
        }
        // deleting either attachment would take the shared file with it
        if !state.db.media.find_by_url(&file.url).await?.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "File is already attached: {}",
                file.url
            ))
            .into());
        }
    }

    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let instance = state
        .db
        .instances
        .create_with_media(target, message, &request.files)
        .await?;

    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn list_instances(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<Vec<InstanceResponse>>, HttpAppError> {
    let target = resolve_target(&state, item_id).await?;
    Ok(Json(state.db.instances.list_for_target(target).await?))
}

/// Delete an instance after removing the files it references
#[tracing::instrument(skip(state))]
pub async fn delete_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpAppError> {
    let instance = state
        .db
        .instances
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Instance not found".to_string()))?;

    let urls: Vec<String> = instance.media.into_iter().map(|m| m.file_url).collect();
    let reports = remove_files_for_urls(&state, &urls).await?;

    state.db.instances.delete(id).await?;
    tracing::info!(
        instance_id = id,
        files_removed = reports.iter().map(|r| r.files_removed).sum::<usize>(),
        "Instance deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
