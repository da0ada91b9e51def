use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use timeline_core::models::MediaRecord;
use timeline_core::{AppError, MediaRecordStore, NewMediaRecord};

pub(crate) const MEDIA_COLUMNS: &str =
    "id, instance_id, file_url, file_type, file_name, file_size, created_at";

/// Postgres-backed media records
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaRecordStore for MediaRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "media", db.operation = "insert"))]
    async fn insert(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
        let created = sqlx::query_as::<Postgres, MediaRecord>(&format!(
            r#"
            INSERT INTO media (instance_id, file_url, file_type, file_name, file_size)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MEDIA_COLUMNS
        ))
        .bind(record.instance_id)
        .bind(&record.file_url)
        .bind(&record.file_type)
        .bind(&record.file_name)
        .bind(record.file_size)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "update", db.record_id = id))]
    async fn update_url(&self, id: i64, file_url: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE media SET file_url = $2 WHERE id = $1")
            .bind(id)
            .bind(file_url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = id))]
    async fn delete_by_id(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = id))]
    async fn find_by_id(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, MediaRecord>(&format!(
            "SELECT {} FROM media WHERE id = $1",
            MEDIA_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn find_by_url(&self, file_url: &str) -> Result<Vec<MediaRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, MediaRecord>(&format!(
            "SELECT {} FROM media WHERE file_url = $1 ORDER BY id ASC",
            MEDIA_COLUMNS
        ))
        .bind(file_url)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self, file_urls), fields(db.table = "media", db.operation = "delete", url_count = file_urls.len()))]
    async fn delete_by_urls(&self, file_urls: &[String]) -> Result<u64, AppError> {
        if file_urls.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM media WHERE file_url = ANY($1)")
            .bind(file_urls)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn list_video_records(&self) -> Result<Vec<MediaRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, MediaRecord>(&format!(
            "SELECT {} FROM media WHERE file_type LIKE 'video/%' OR file_url LIKE '%.mp4' ORDER BY id ASC",
            MEDIA_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
