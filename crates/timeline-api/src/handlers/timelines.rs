use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use timeline_core::models::{
    check_date_range, CreateTimelineRequest, Timeline, UpdateTimelineRequest,
};
use timeline_core::AppError;
use validator::Validate;

use crate::auth::AuthContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::media::remove_files_for_urls;
use crate::state::AppState;

pub async fn list_timelines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Timeline>>, HttpAppError> {
    Ok(Json(state.db.timelines.list().await?))
}

#[tracing::instrument(skip(state, ctx, request), fields(user_id = ctx.user_id))]
pub async fn create_timeline(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    ValidatedJson(request): ValidatedJson<CreateTimelineRequest>,
) -> Result<(StatusCode, Json<Timeline>), HttpAppError> {
    request.validate().map_err(AppError::from)?;
    check_date_range(request.start_date, request.end_date)?;

    let timeline = state.db.timelines.create(ctx.user_id, &request).await?;
    tracing::info!(timeline_id = timeline.id, "Timeline created");

    Ok((StatusCode::CREATED, Json(timeline)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<UpdateTimelineRequest>,
) -> Result<Json<Timeline>, HttpAppError> {
    if request.is_empty() {
        return Err(AppError::InvalidInput("No fields to update".to_string()).into());
    }
    request.validate().map_err(AppError::from)?;
    // the stored dates are checked by the table constraint
    check_date_range(request.start_date.flatten(), request.end_date.flatten())?;

    let timeline = state
        .db
        .timelines
        .update(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound("Timeline not found".to_string()))?;

    Ok(Json(timeline))
}

/// Delete a timeline, its items, their instances and every attached file
#[tracing::instrument(skip(state))]
pub async fn delete_timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpAppError> {
    let urls = state.db.timelines.media_urls(id).await?;
    let reports = remove_files_for_urls(&state, &urls).await?;

    if !state.db.timelines.delete(id).await? {
        return Err(AppError::NotFound("Timeline not found".to_string()).into());
    }
    tracing::info!(
        timeline_id = id,
        files_removed = reports.iter().map(|r| r.files_removed).sum::<usize>(),
        "Timeline deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
