use sqlx::{PgPool, Postgres};
use timeline_core::models::{CreateTimelineRequest, Timeline, UpdateTimelineRequest};
use timeline_core::AppError;

const TIMELINE_COLUMNS: &str = "id, user_id, title, description, start_date, end_date, created_at";

#[derive(Clone)]
pub struct TimelineRepository {
    pool: PgPool,
}

impl TimelineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "timelines", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Timeline>, AppError> {
        let timelines = sqlx::query_as::<Postgres, Timeline>(&format!(
            "SELECT {} FROM timelines ORDER BY start_date ASC NULLS LAST, id ASC",
            TIMELINE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(timelines)
    }

    #[tracing::instrument(skip(self, request), fields(db.table = "timelines", db.operation = "insert"))]
    pub async fn create(
        &self,
        user_id: i64,
        request: &CreateTimelineRequest,
    ) -> Result<Timeline, AppError> {
        let timeline = sqlx::query_as::<Postgres, Timeline>(&format!(
            r#"
            INSERT INTO timelines (user_id, title, description, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TIMELINE_COLUMNS
        ))
        .bind(user_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(timeline)
    }

    /// Write every field present in `request`, including explicit nulls.
    /// `None` if the timeline does not exist.
    #[tracing::instrument(skip(self, request), fields(db.table = "timelines", db.operation = "update", db.record_id = id))]
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateTimelineRequest,
    ) -> Result<Option<Timeline>, AppError> {
        // each nullable column takes a presence flag and a value
        let timeline = sqlx::query_as::<Postgres, Timeline>(&format!(
            r#"
            UPDATE timelines SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                start_date = CASE WHEN $5 THEN $6 ELSE start_date END,
                end_date = CASE WHEN $7 THEN $8 ELSE end_date END
            WHERE id = $1
            RETURNING {}
            "#,
            TIMELINE_COLUMNS
        ))
        .bind(id)
        .bind(&request.title)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .bind(request.start_date.is_some())
        .bind(request.start_date.flatten())
        .bind(request.end_date.is_some())
        .bind(request.end_date.flatten())
        .fetch_optional(&self.pool)
        .await?;

        Ok(timeline)
    }

    /// Delete a timeline with its items and their instances. Media rows go
    /// with the instances; files on disk are left to the caller.
    #[tracing::instrument(skip(self), fields(db.table = "timelines", db.operation = "delete", db.record_id = id))]
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM instances
            WHERE (target_kind = 'occurrence' AND target_id IN (SELECT id FROM occurrences WHERE timeline_id = $1))
               OR (target_kind = 'span' AND target_id IN (SELECT id FROM spans WHERE timeline_id = $1))
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // occurrences and spans cascade
        let result = sqlx::query("DELETE FROM timelines WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Media URLs attached anywhere on a timeline, for file cleanup before delete.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn media_urls(&self, id: i64) -> Result<Vec<String>, AppError> {
        let urls = sqlx::query_scalar::<Postgres, String>(
            r#"
            SELECT m.file_url FROM media m
            JOIN instances i ON i.id = m.instance_id
            WHERE (i.target_kind = 'occurrence' AND i.target_id IN (SELECT id FROM occurrences WHERE timeline_id = $1))
               OR (i.target_kind = 'span' AND i.target_id IN (SELECT id FROM spans WHERE timeline_id = $1))
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(urls)
    }
}
