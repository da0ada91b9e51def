//! Health check

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// "healthy", "timeout", or "{prefix}: {error}"
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = run_check(
        CHECK_TIMEOUT,
        async {
            sqlx::query("SELECT 1")
                .execute(&state.db.pool)
                .await
                .map(|_| ())
        },
        "error",
    )
    .await;

    let storage = run_check(
        CHECK_TIMEOUT,
        async {
            let meta = tokio::fs::metadata(state.media.storage.base_path()).await?;
            if meta.is_dir() {
                Ok::<(), std::io::Error>(())
            } else {
                Err(std::io::Error::other("upload path is not a directory"))
            }
        },
        "error",
    )
    .await;

    let healthy = database == "healthy" && storage == "healthy";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            database,
            storage,
        }),
    )
}
