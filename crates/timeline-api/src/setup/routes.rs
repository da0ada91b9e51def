//! Route configuration

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use timeline_core::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::auth_middleware;
use crate::handlers;
use crate::state::AppState;

// multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config);
    let max_upload = config.max_upload_size_bytes();

    let protected_routes = protected_routes(config, state.clone()).layer(
        axum::middleware::from_fn_with_state(state.jwt.clone(), auth_middleware),
    );

    // innermost first: body limit, then cors, then tracing around everything
    let app = public_routes()
        .merge(protected_routes)
        .layer(RequestBodyLimitLayer::new(
            max_upload.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/clear-session", get(handlers::auth::logout))
        .route("/health", get(handlers::health::health_check))
}

fn protected_routes(config: &Config, state: Arc<AppState>) -> Router<Arc<AppState>> {
    let uploads_path = upload_mount_path(config.upload_url_prefix());

    Router::new()
        .route(
            "/timelines",
            get(handlers::timelines::list_timelines).post(handlers::timelines::create_timeline),
        )
        .route(
            "/timelines/{id}",
            patch(handlers::timelines::update_timeline).delete(handlers::timelines::delete_timeline),
        )
        .route(
            "/occurrences",
            get(handlers::occurrences::list_items).post(handlers::occurrences::create_item),
        )
        .route(
            "/occurrences/{id}",
            patch(handlers::occurrences::update_item).delete(handlers::occurrences::delete_item),
        )
        .route(
            "/occurrences/{id}/instances",
            get(handlers::instances::list_instances).post(handlers::instances::create_instance),
        )
        .route("/instances/{id}", delete(handlers::instances::delete_instance))
        .route(
            "/upload",
            post(handlers::upload::upload_file).layer(DefaultBodyLimit::max(
                config
                    .max_upload_size_bytes()
                    .saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/media/{id}", delete(handlers::media::delete_media))
        .nest_service(&uploads_path, ServeDir::new(state.media.storage.base_path()))
}

/// Mount point for static uploads, derived from the URL prefix
fn upload_mount_path(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/uploads".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins()
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
