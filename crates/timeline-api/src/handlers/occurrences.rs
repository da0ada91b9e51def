//! Occurrences and spans, served together under `/occurrences`

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use timeline_core::models::{
    check_date_range, AttachmentTarget, CreateItemRequest, TimelineItemResponse,
    UpdateItemRequest,
};
use timeline_core::AppError;
use validator::Validate;

use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::media::remove_files_for_urls;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub timeline_id: Option<i64>,
}

/// Resolve `id` to the span or occurrence it names, or 404
pub(crate) async fn resolve_target(
    state: &AppState,
    id: i64,
) -> Result<AttachmentTarget, HttpAppError> {
    state
        .db
        .items
        .resolve(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()).into())
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<TimelineItemResponse>>, HttpAppError> {
    let items = state.db.items.list(query.timeline_id).await?;
    Ok(Json(items.into_iter().map(TimelineItemResponse::from).collect()))
}

#[tracing::instrument(skip(state, request), fields(timeline_id = request.timeline_id, is_span = request.is_span))]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<TimelineItemResponse>), HttpAppError> {
    request.validate().map_err(AppError::from)?;
    if request.is_span {
        check_date_range(request.start_date, request.end_date)?;
    }

    let item = state.db.items.create(&request).await?;
    tracing::info!(item_id = item.id(), "Timeline item created");

    Ok((StatusCode::CREATED, Json(item.into())))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<TimelineItemResponse>, HttpAppError> {
    let target = resolve_target(&state, id).await?;
    if request.is_empty_for(&target) {
        return Err(AppError::InvalidInput("No fields to update".to_string()).into());
    }
    request.validate().map_err(AppError::from)?;
    if let AttachmentTarget::Span(_) = target {
        // the stored dates are checked by the table constraint
        check_date_range(request.start_date.flatten(), request.end_date.flatten())?;
    }

    let item = state
        .db
        .items
        .update(target, &request)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    Ok(Json(item.into()))
}

/// Delete an item, its instances and their files
#[tracing::instrument(skip(state))]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpAppError> {
    let target = resolve_target(&state, id).await?;

    let urls: Vec<String> = state
        .db
        .instances
        .list_for_target(target)
        .await?
        .into_iter()
        .flat_map(|instance| instance.media)
        .map(|record| record.file_url)
        .collect();
    remove_files_for_urls(&state, &urls).await?;

    if !state.db.items.delete(target).await? {
        return Err(AppError::NotFound("Item not found".to_string()).into());
    }
    tracing::info!(%target, "Timeline item deleted");

    Ok(StatusCode::NO_CONTENT)
}
