use std::collections::HashMap;

use sqlx::{PgPool, Postgres};
use timeline_core::models::{AttachedFile, AttachmentTarget, Instance, InstanceResponse, MediaRecord};
use timeline_core::AppError;

use super::media::MEDIA_COLUMNS;

const INSTANCE_COLUMNS: &str = "id, target_kind, target_id, message, created_at";

#[derive(Clone)]
pub struct InstanceRepository {
    pool: PgPool,
}

impl InstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an instance and one media row per attached file, atomically
    #[tracing::instrument(skip(self, message, files), fields(db.table = "instances", db.operation = "insert", target = %target, file_count = files.len()))]
    pub async fn create_with_media(
        &self,
        target: AttachmentTarget,
        message: Option<&str>,
        files: &[AttachedFile],
    ) -> Result<InstanceResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let instance = sqlx::query_as::<Postgres, Instance>(&format!(
            r#"
            INSERT INTO instances (target_kind, target_id, message)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        ))
        .bind(target.kind())
        .bind(target.id())
        .bind(message)
        .fetch_one(&mut *tx)
        .await?;

        let mut media = Vec::with_capacity(files.len());
        for file in files {
            let record = sqlx::query_as::<Postgres, MediaRecord>(&format!(
                r#"
                INSERT INTO media (instance_id, file_url, file_type, file_name, file_size)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                MEDIA_COLUMNS
            ))
            .bind(instance.id)
            .bind(&file.url)
            .bind(&file.content_type)
            .bind(&file.name)
            .bind(file.size)
            .fetch_one(&mut *tx)
            .await?;
            media.push(record);
        }

        tx.commit().await?;

        tracing::info!(
            instance_id = instance.id,
            media_count = media.len(),
            "Instance created"
        );

        Ok(InstanceResponse { instance, media })
    }

    /// Instances for a target, oldest first, each with its media
    #[tracing::instrument(skip(self), fields(db.table = "instances", db.operation = "select", target = %target))]
    pub async fn list_for_target(
        &self,
        target: AttachmentTarget,
    ) -> Result<Vec<InstanceResponse>, AppError> {
        let instances = sqlx::query_as::<Postgres, Instance>(&format!(
            "SELECT {} FROM instances WHERE target_kind = $1 AND target_id = $2 ORDER BY created_at ASC, id ASC",
            INSTANCE_COLUMNS
        ))
        .bind(target.kind())
        .bind(target.id())
        .fetch_all(&self.pool)
        .await?;

        if instances.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = instances.iter().map(|i| i.id).collect();
        let media = sqlx::query_as::<Postgres, MediaRecord>(&format!(
            "SELECT {} FROM media WHERE instance_id = ANY($1) ORDER BY id ASC",
            MEDIA_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_instance: HashMap<i64, Vec<MediaRecord>> = HashMap::new();
        for record in media {
            by_instance.entry(record.instance_id).or_default().push(record);
        }

        Ok(instances
            .into_iter()
            .map(|instance| {
                let media = by_instance.remove(&instance.id).unwrap_or_default();
                InstanceResponse { instance, media }
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "instances", db.operation = "select", db.record_id = id))]
    pub async fn find(&self, id: i64) -> Result<Option<InstanceResponse>, AppError> {
        let Some(instance) = sqlx::query_as::<Postgres, Instance>(&format!(
            "SELECT {} FROM instances WHERE id = $1",
            INSTANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let media = sqlx::query_as::<Postgres, MediaRecord>(&format!(
            "SELECT {} FROM media WHERE instance_id = $1 ORDER BY id ASC",
            MEDIA_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(InstanceResponse { instance, media }))
    }

    /// Remove the instance row; its media rows cascade.
    #[tracing::instrument(skip(self), fields(db.table = "instances", db.operation = "delete", db.record_id = id))]
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
