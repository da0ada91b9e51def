use uuid::Uuid;

/// Longest name most filesystems accept for a single path component.
const MAX_NAME_LEN: usize = 255;

/// `{uuid}_` prefix length.
const PREFIX_LEN: usize = 37;

/// Reduce a client-supplied file name to a safe basename.
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX_NAME_LEN - PREFIX_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

/// Collision-resistant storage name for an upload.
pub fn unique_name(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_filename(original))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("/tmp/a/clip.mov"), "clip.mov");
        assert_eq!(sanitize_filename("C:\\Users\\me\\clip.mov"), "clip.mov");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my clip (1).mp4"), "my_clip__1_.mp4");
        assert_eq!(sanitize_filename("été.jpg"), "_t_.jpg");
    }

    #[test]
    fn test_sanitize_rejects_traversal_and_short_names() {
        assert_eq!(sanitize_filename("..hidden"), "invalid_filename");
        assert_eq!(sanitize_filename("a"), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_sanitize_bounds_length() {
        let long = "x".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), MAX_NAME_LEN - PREFIX_LEN);
        assert!(unique_name(&long).len() <= MAX_NAME_LEN);
    }

    #[test]
    fn test_unique_name_shape() {
        let a = unique_name("clip.mov");
        let b = unique_name("clip.mov");
        assert_ne!(a, b);
        assert!(a.ends_with("_clip.mov"));
        assert_eq!(a.len(), PREFIX_LEN + "clip.mov".len());
    }
}
