//! Record-store contract for persisted media records
//!
//! The media pipeline and derivative cleanup only see media records through
//! this trait; the database crate provides the Postgres implementation.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::MediaRecord;

/// Fields needed to persist a new media record
#[derive(Debug, Clone)]
pub struct NewMediaRecord {
    pub instance_id: i64,
    pub file_url: String,
    pub file_type: String,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
}

#[async_trait]
pub trait MediaRecordStore: Send + Sync {
    async fn insert(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError>;

    /// Repoint a record at a different servable file. Returns false if the id is unknown.
    async fn update_url(&self, id: i64, file_url: &str) -> Result<bool, AppError>;

    async fn delete_by_id(&self, id: i64) -> Result<bool, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<MediaRecord>, AppError>;

    async fn find_by_url(&self, file_url: &str) -> Result<Vec<MediaRecord>, AppError>;

    /// Delete every record pointing at one of `file_urls`, returning how many went.
    async fn delete_by_urls(&self, file_urls: &[String]) -> Result<u64, AppError>;

    /// Records that reference video files (by declared type or `.mp4` URL).
    async fn list_video_records(&self) -> Result<Vec<MediaRecord>, AppError>;
}
