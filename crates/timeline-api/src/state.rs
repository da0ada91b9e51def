//! Application state
//!
//! Split into sub-states so each piece can be built and replaced on its own
//! (tests swap the media tools and leave the rest untouched).

use std::sync::Arc;

use sqlx::PgPool;
use timeline_core::Config;
use timeline_db::{
    InstanceRepository, MediaRepository, TimelineItemRepository, TimelineRepository,
    UserRepository,
};
use timeline_processing::{DerivativeRegistry, UploadPipeline};
use timeline_storage::LocalStorage;

use crate::auth::JwtService;

/// Database pool and repositories
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub users: UserRepository,
    pub timelines: TimelineRepository,
    pub items: TimelineItemRepository,
    pub instances: InstanceRepository,
    pub media: MediaRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            timelines: TimelineRepository::new(pool.clone()),
            items: TimelineItemRepository::new(pool.clone()),
            instances: InstanceRepository::new(pool.clone()),
            media: MediaRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Upload directory, pipeline and derivative cleanup
#[derive(Clone)]
pub struct MediaState {
    pub storage: LocalStorage,
    pub pipeline: UploadPipeline,
    pub registry: DerivativeRegistry,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: DbState,
    pub media: MediaState,
    pub jwt: Arc<JwtService>,
}
