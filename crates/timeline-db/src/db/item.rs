use sqlx::{PgPool, Postgres};
use timeline_core::models::{
    sort_chronologically, AttachmentTarget, CreateItemRequest, Occurrence, Span, TimelineItem,
    UpdateItemRequest,
};
use timeline_core::AppError;

/// Occurrences and spans, addressed through one shared id space
#[derive(Clone)]
pub struct TimelineItemRepository {
    pool: PgPool,
}

impl TimelineItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Both kinds merged in chronological order, optionally for one timeline
    #[tracing::instrument(skip(self), fields(db.table = "occurrences,spans", db.operation = "select"))]
    pub async fn list(&self, timeline_id: Option<i64>) -> Result<Vec<TimelineItem>, AppError> {
        let occurrences = sqlx::query_as::<Postgres, Occurrence>(
            r#"
            SELECT id, timeline_id, title, date, description FROM occurrences
            WHERE ($1::BIGINT IS NULL OR timeline_id = $1)
            "#,
        )
        .bind(timeline_id)
        .fetch_all(&self.pool)
        .await?;

        let spans = sqlx::query_as::<Postgres, Span>(
            r#"
            SELECT id, timeline_id, title, start_date, end_date, description FROM spans
            WHERE ($1::BIGINT IS NULL OR timeline_id = $1)
            "#,
        )
        .bind(timeline_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items: Vec<TimelineItem> = occurrences
            .into_iter()
            .map(TimelineItem::Occurrence)
            .chain(spans.into_iter().map(TimelineItem::Span))
            .collect();
        sort_chronologically(&mut items);

        Ok(items)
    }

    /// Insert a span when `is_span` is set, otherwise an occurrence
    #[tracing::instrument(skip(self, request), fields(db.operation = "insert", is_span = request.is_span))]
    pub async fn create(&self, request: &CreateItemRequest) -> Result<TimelineItem, AppError> {
        let timeline_exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM timelines WHERE id = $1)",
        )
        .bind(request.timeline_id)
        .fetch_one(&self.pool)
        .await?;

        if !timeline_exists {
            return Err(AppError::NotFound("Timeline not found".to_string()));
        }

        let item = if request.is_span {
            let span = sqlx::query_as::<Postgres, Span>(
                r#"
                INSERT INTO spans (timeline_id, title, start_date, end_date, description)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, timeline_id, title, start_date, end_date, description
                "#,
            )
            .bind(request.timeline_id)
            .bind(&request.title)
            .bind(request.start_date)
            .bind(request.end_date)
            .bind(&request.description)
            .fetch_one(&self.pool)
            .await?;
            TimelineItem::Span(span)
        } else {
            let occurrence = sqlx::query_as::<Postgres, Occurrence>(
                r#"
                INSERT INTO occurrences (timeline_id, title, date, description)
                VALUES ($1, $2, $3, $4)
                RETURNING id, timeline_id, title, date, description
                "#,
            )
            .bind(request.timeline_id)
            .bind(&request.title)
            .bind(request.date)
            .bind(&request.description)
            .fetch_one(&self.pool)
            .await?;
            TimelineItem::Occurrence(occurrence)
        };

        Ok(item)
    }

    /// Which table `id` lives in, found with a single query over both
    #[tracing::instrument(skip(self), fields(db.table = "occurrences,spans", db.operation = "select", db.record_id = id))]
    pub async fn resolve(&self, id: i64) -> Result<Option<AttachmentTarget>, AppError> {
        let row = sqlx::query_as::<Postgres, (String, i64)>(
            r#"
            SELECT 'span' AS kind, id FROM spans WHERE id = $1
            UNION ALL
            SELECT 'occurrence' AS kind, id FROM occurrences WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(kind, id)| AttachmentTarget::from_parts(&kind, id)))
    }

    /// Update the fields of `request` that apply to `target`'s kind
    #[tracing::instrument(skip(self, request), fields(db.operation = "update", target = %target))]
    pub async fn update(
        &self,
        target: AttachmentTarget,
        request: &UpdateItemRequest,
    ) -> Result<Option<TimelineItem>, AppError> {
        let item = match target {
            AttachmentTarget::Span(id) => sqlx::query_as::<Postgres, Span>(
                r#"
                UPDATE spans SET
                    title = COALESCE($2, title),
                    start_date = CASE WHEN $3 THEN $4 ELSE start_date END,
                    end_date = CASE WHEN $5 THEN $6 ELSE end_date END,
                    description = CASE WHEN $7 THEN $8 ELSE description END
                WHERE id = $1
                RETURNING id, timeline_id, title, start_date, end_date, description
                "#,
            )
            .bind(id)
            .bind(&request.title)
            .bind(request.start_date.is_some())
            .bind(request.start_date.flatten())
            .bind(request.end_date.is_some())
            .bind(request.end_date.flatten())
            .bind(request.description.is_some())
            .bind(request.description.clone().flatten())
            .fetch_optional(&self.pool)
            .await?
            .map(TimelineItem::Span),
            AttachmentTarget::Occurrence(id) => sqlx::query_as::<Postgres, Occurrence>(
                r#"
                UPDATE occurrences SET
                    title = COALESCE($2, title),
                    date = CASE WHEN $3 THEN $4 ELSE date END,
                    description = CASE WHEN $5 THEN $6 ELSE description END
                WHERE id = $1
                RETURNING id, timeline_id, title, date, description
                "#,
            )
            .bind(id)
            .bind(&request.title)
            .bind(request.date.is_some())
            .bind(request.date.flatten())
            .bind(request.description.is_some())
            .bind(request.description.clone().flatten())
            .fetch_optional(&self.pool)
            .await?
            .map(TimelineItem::Occurrence),
        };

        Ok(item)
    }

    /// Delete an item and the instances attached to it
    #[tracing::instrument(skip(self), fields(db.operation = "delete", target = %target))]
    pub async fn delete(&self, target: AttachmentTarget) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM instances WHERE target_kind = $1 AND target_id = $2")
            .bind(target.kind())
            .bind(target.id())
            .execute(&mut *tx)
            .await?;

        let sql = match target {
            AttachmentTarget::Span(_) => "DELETE FROM spans WHERE id = $1",
            AttachmentTarget::Occurrence(_) => "DELETE FROM occurrences WHERE id = $1",
        };
        let result = sqlx::query(sql).bind(target.id()).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
