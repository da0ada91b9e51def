//! Multipart upload into the media pipeline

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use timeline_core::constants::UPLOAD_FIELD;
use timeline_core::models::FileDescriptor;
use timeline_core::AppError;
use timeline_processing::IncomingUpload;

use crate::auth::AuthContext;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Store the `file` part, run it through the pipeline and describe the
/// servable result.
#[tracing::instrument(skip(state, ctx, multipart), fields(user_id = ctx.user_id))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    mut multipart: Multipart,
) -> Result<Json<FileDescriptor>, HttpAppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        upload = Some(IncomingUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{}'", UPLOAD_FIELD))
    })?;

    let outcome = state.media.pipeline.process_upload(upload).await?;
    Ok(Json(outcome.descriptor))
}
