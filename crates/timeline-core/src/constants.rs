//! Application-wide constants.

/// Cookie carrying the session JWT for browser clients.
pub const SESSION_COOKIE: &str = "session";

/// The account whose sessions receive the `admin` role. Everyone else is a viewer.
pub const ADMIN_USERNAME: &str = "admin";

/// Multipart field holding the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Container every derivative is written to.
pub const DERIVATIVE_EXTENSION: &str = "mp4";

/// Suffix of the transcoded derivative (`clip_web.mp4`).
pub const TRANSCODED_SUFFIX: &str = "_web";

/// Suffix appended by the orientation fix (`clip_web.mp4` -> `clip_web_fixed.mp4`).
pub const FIXED_SUFFIX: &str = "_fixed";

/// Suffix of an orientation-fixed transcoded derivative.
pub const TRANSCODED_FIXED_SUFFIX: &str = "_web_fixed";
