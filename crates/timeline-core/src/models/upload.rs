use serde::{Deserialize, Serialize};

/// Result of a completed upload: where the servable file lives, its size and
/// the content type declared by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl FileDescriptor {
    /// File name component of the URL.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_serializes_type_key() {
        let fd = FileDescriptor {
            url: "/uploads/abc_clip_web.mp4".to_string(),
            size: 42,
            content_type: "video/quicktime".to_string(),
        };
        let json = serde_json::to_value(&fd).unwrap();
        assert_eq!(json["type"], "video/quicktime");
        assert_eq!(json["size"], 42);
        assert_eq!(fd.file_name(), "abc_clip_web.mp4");
    }
}
