use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::AttachmentTarget;

/// A message unit attached to an occurrence or span
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Instance {
    pub id: i64,
    pub target_kind: String,
    pub target_id: i64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Instance {
    pub fn target(&self) -> Option<AttachmentTarget> {
        AttachmentTarget::from_parts(&self.target_kind, self.target_id)
    }
}

/// Persisted link between an instance and the currently servable file
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MediaRecord {
    pub id: i64,
    pub instance_id: i64,
    pub file_url: String,
    pub file_type: String,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Instance with its media, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct InstanceResponse {
    #[serde(flatten)]
    pub instance: Instance,
    pub media: Vec<MediaRecord>,
}

/// A previously uploaded file to attach to a new instance
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttachedFile {
    #[validate(length(min = 1, max = 2048, message = "File URL must not be empty"))]
    pub url: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 255, message = "File type must not be empty"))]
    pub content_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

/// Request DTO for `POST /occurrences/{id}/instances`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInstanceRequest {
    #[serde(default)]
    #[validate(length(max = 10000, message = "Message must be at most 10000 characters"))]
    pub message: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub files: Vec<AttachedFile>,
}

impl CreateInstanceRequest {
    pub fn is_empty(&self) -> bool {
        self.message.as_deref().map_or(true, |m| m.trim().is_empty()) && self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_instance_request_parses_type_field() {
        let req: CreateInstanceRequest = serde_json::from_str(
            r#"{"message":"hi","files":[{"url":"/uploads/a.mp4","type":"video/mp4","size":10}]}"#,
        )
        .unwrap();
        assert_eq!(req.files[0].content_type, "video/mp4");
        assert!(req.validate().is_ok());
        assert!(!req.is_empty());
    }

    #[test]
    fn test_create_instance_request_empty() {
        let req: CreateInstanceRequest = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert!(req.is_empty());
    }

    #[test]
    fn test_nested_file_validation() {
        let req: CreateInstanceRequest =
            serde_json::from_str(r#"{"files":[{"url":"","type":"image/png"}]}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
