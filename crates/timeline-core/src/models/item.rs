use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A single dated event on a timeline
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Occurrence {
    pub id: i64,
    pub timeline_id: i64,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// An event covering a date range
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Span {
    pub id: i64,
    pub timeline_id: i64,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// What an id under `/occurrences/{id}` refers to.
///
/// Occurrences and spans share one id sequence, so a lookup resolves to at
/// most one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentTarget {
    Span(i64),
    Occurrence(i64),
}

impl AttachmentTarget {
    pub const SPAN: &'static str = "span";
    pub const OCCURRENCE: &'static str = "occurrence";

    pub fn id(&self) -> i64 {
        match self {
            AttachmentTarget::Span(id) | AttachmentTarget::Occurrence(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttachmentTarget::Span(_) => Self::SPAN,
            AttachmentTarget::Occurrence(_) => Self::OCCURRENCE,
        }
    }

    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            Self::SPAN => Some(AttachmentTarget::Span(id)),
            Self::OCCURRENCE => Some(AttachmentTarget::Occurrence(id)),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Either kind of timeline entry, tagged with `type` in JSON
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineItem {
    Occurrence(Occurrence),
    Span(Span),
}

impl TimelineItem {
    pub fn id(&self) -> i64 {
        match self {
            TimelineItem::Occurrence(o) => o.id,
            TimelineItem::Span(s) => s.id,
        }
    }

    pub fn is_span(&self) -> bool {
        matches!(self, TimelineItem::Span(_))
    }

    /// Date used for chronological ordering.
    pub fn sort_date(&self) -> Option<NaiveDate> {
        match self {
            TimelineItem::Occurrence(o) => o.date,
            TimelineItem::Span(s) => s.start_date,
        }
    }

    pub fn target(&self) -> AttachmentTarget {
        match self {
            TimelineItem::Occurrence(o) => AttachmentTarget::Occurrence(o.id),
            TimelineItem::Span(s) => AttachmentTarget::Span(s.id),
        }
    }
}

/// Wire form of a timeline entry: the item plus the `is_span` flag the
/// frontend keys on (`span` is kept for older clients).
#[derive(Debug, Clone, Serialize)]
pub struct TimelineItemResponse {
    #[serde(flatten)]
    pub item: TimelineItem,
    pub is_span: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<bool>,
}

impl From<TimelineItem> for TimelineItemResponse {
    fn from(item: TimelineItem) -> Self {
        let is_span = item.is_span();
        TimelineItemResponse {
            item,
            is_span,
            span: is_span.then_some(true),
        }
    }
}

/// Orders items by date, undated entries last, ties broken by id.
pub fn sort_chronologically(items: &mut [TimelineItem]) {
    items.sort_by(|a, b| match (a.sort_date(), b.sort_date()) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.id().cmp(&b.id())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id().cmp(&b.id()),
    });
}

/// Request DTO for `POST /occurrences`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    pub timeline_id: i64,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,
    #[serde(default)]
    pub is_span: bool,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request DTO for `PATCH /occurrences/{id}`.
///
/// Fields that do not apply to the resolved target are ignored. A key sent
/// as `null` clears that column; `title` cannot be cleared.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
}

impl UpdateItemRequest {
    /// True when nothing applicable to `target` would change.
    pub fn is_empty_for(&self, target: &AttachmentTarget) -> bool {
        let common = self.title.is_none() && self.description.is_none();
        match target {
            AttachmentTarget::Span(_) => {
                common && self.start_date.is_none() && self.end_date.is_none()
            }
            AttachmentTarget::Occurrence(_) => common && self.date.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn occurrence(id: i64, d: Option<NaiveDate>) -> TimelineItem {
        TimelineItem::Occurrence(Occurrence {
            id,
            timeline_id: 1,
            title: format!("o{id}"),
            date: d,
            description: None,
        })
    }

    fn span(id: i64, start: Option<NaiveDate>) -> TimelineItem {
        TimelineItem::Span(Span {
            id,
            timeline_id: 1,
            title: format!("s{id}"),
            start_date: start,
            end_date: None,
            description: None,
        })
    }

    #[test]
    fn test_sort_chronologically_interleaves_kinds() {
        let mut items = vec![
            occurrence(1, date("2024-03-01")),
            span(2, date("2024-01-15")),
            occurrence(3, None),
            occurrence(4, date("2024-02-01")),
        ];
        sort_chronologically(&mut items);
        let ids: Vec<i64> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_item_response_json_shape() {
        let json = serde_json::to_value(TimelineItemResponse::from(span(7, date("2024-01-01"))))
            .unwrap();
        assert_eq!(json["type"], "span");
        assert_eq!(json["is_span"], true);
        assert_eq!(json["span"], true);
        assert_eq!(json["id"], 7);

        let json = serde_json::to_value(TimelineItemResponse::from(occurrence(8, None))).unwrap();
        assert_eq!(json["type"], "occurrence");
        assert_eq!(json["is_span"], false);
        assert!(json.get("span").is_none());
    }

    #[test]
    fn test_attachment_target_parts() {
        assert_eq!(
            AttachmentTarget::from_parts("span", 3),
            Some(AttachmentTarget::Span(3))
        );
        assert_eq!(AttachmentTarget::from_parts("event", 3), None);
        assert_eq!(AttachmentTarget::Occurrence(9).kind(), "occurrence");
        assert_eq!(AttachmentTarget::Occurrence(9).to_string(), "occurrence 9");
    }

    #[test]
    fn test_update_emptiness_depends_on_target() {
        let patch = UpdateItemRequest {
            date: Some(date("2024-01-01")),
            ..Default::default()
        };
        assert!(!patch.is_empty_for(&AttachmentTarget::Occurrence(1)));
        assert!(patch.is_empty_for(&AttachmentTarget::Span(1)));
    }

    #[test]
    fn test_update_null_counts_as_present() {
        let patch: UpdateItemRequest = serde_json::from_str(r#"{"end_date":null}"#).unwrap();
        assert_eq!(patch.end_date, Some(None));
        assert!(!patch.is_empty_for(&AttachmentTarget::Span(1)));
        assert!(patch.is_empty_for(&AttachmentTarget::Occurrence(1)));

        let patch: UpdateItemRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(patch.is_empty_for(&AttachmentTarget::Span(1)));
    }
}
