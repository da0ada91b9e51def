use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A named, optionally bounded period owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Timeline {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for creating a timeline
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTimelineRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Partial update. Every key present is written, so `"description": null`
/// clears the column. `title` cannot be cleared.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTimelineRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub end_date: Option<Option<NaiveDate>>,
}

impl UpdateTimelineRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// Rejects ranges that end before they start. Open ranges are fine.
pub fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), crate::AppError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(crate::AppError::InvalidInput(
            "end_date must not be before start_date".to_string(),
        )),
        _ => Ok(()),
    }
}
