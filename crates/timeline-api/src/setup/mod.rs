//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use timeline_core::Config;
use timeline_processing::{
    process::validate_tool_path, DerivativeRegistry, ExternalProcess, TokioProcessRunner,
    UploadPipeline,
};
use timeline_storage::LocalStorage;

use crate::auth::JwtService;
use crate::state::{AppState, DbState, MediaState};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry();
    tracing::info!(
        environment = config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = LocalStorage::new(config.upload_dir(), config.upload_url_prefix())
        .await
        .with_context(|| format!("Failed to open upload directory {:?}", config.upload_dir()))?;

    let state = build_state(config.clone(), pool, storage, Arc::new(TokioProcessRunner));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;
    let processing = config.processing();
    validate_tool_path(&processing.ffprobe_path).map_err(anyhow::Error::msg)?;
    validate_tool_path(&processing.ffmpeg_path).map_err(anyhow::Error::msg)?;
    Ok(())
}

/// Wire repositories, storage and the media pipeline into one state.
///
/// `runner` executes ffprobe/ffmpeg; tests pass a scripted one.
pub fn build_state(
    config: Config,
    pool: PgPool,
    storage: LocalStorage,
    runner: Arc<dyn ExternalProcess>,
) -> Arc<AppState> {
    let db = DbState::new(pool);
    let pipeline = UploadPipeline::new(storage.clone(), runner, config.processing().clone());
    let registry = DerivativeRegistry::new(storage.clone(), Arc::new(db.media.clone()));
    let jwt = Arc::new(JwtService::new(
        config.jwt_secret(),
        config.jwt_expiry_hours(),
    ));

    Arc::new(AppState {
        config,
        db,
        media: MediaState {
            storage,
            pipeline,
            registry,
        },
        jwt,
    })
}
