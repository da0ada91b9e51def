//! Configuration module
//!
//! Configuration for the API server and the media pipeline, loaded from the
//! environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 5000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 12;

// Media pipeline defaults
const UPLOAD_DIR: &str = "uploads";
const UPLOAD_URL_PREFIX: &str = "/uploads";
const MAX_UPLOAD_SIZE_MB: usize = 500;
const PROBE_TIMEOUT_SECS: u64 = 5;
const ROTATION_PROBE_TIMEOUT_SECS: u64 = 10;
const TRANSCODE_TIMEOUT_SECS: u64 = 300;
const ORIENTATION_TIMEOUT_SECS: u64 = 180;
const COMPATIBLE_CODEC: &str = "h264";
const TRANSCODE_CODECS: &str = "hevc,h265";

/// Settings shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
}

/// Media pipeline settings.
///
/// Kept free of environment access so the processing crate can be driven
/// directly from tests and the CLI.
#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub probe_timeout: Duration,
    pub rotation_probe_timeout: Duration,
    pub transcode_timeout: Duration,
    pub orientation_timeout: Duration,
    /// Codec that browsers play without conversion.
    pub compatible_codec: String,
    /// Codecs known to need conversion. Anything else is served as uploaded.
    pub transcode_codecs: Vec<String>,
    pub upload_url_prefix: String,
    pub max_upload_size_bytes: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            rotation_probe_timeout: Duration::from_secs(ROTATION_PROBE_TIMEOUT_SECS),
            transcode_timeout: Duration::from_secs(TRANSCODE_TIMEOUT_SECS),
            orientation_timeout: Duration::from_secs(ORIENTATION_TIMEOUT_SECS),
            compatible_codec: COMPATIBLE_CODEC.to_string(),
            transcode_codecs: parse_list(TRANSCODE_CODECS),
            upload_url_prefix: UPLOAD_URL_PREFIX.to_string(),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
        }
    }
}

impl ProcessingConfig {
    pub fn is_compatible_codec(&self, codec: &str) -> bool {
        self.compatible_codec.eq_ignore_ascii_case(codec)
    }

    pub fn needs_transcode(&self, codec: &str) -> bool {
        self.transcode_codecs
            .iter()
            .any(|c| c.eq_ignore_ascii_case(codec))
    }
}

/// Full application configuration
#[derive(Clone, Debug)]
pub struct TimelineConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub processing: ProcessingConfig,
}

/// Application configuration, boxed so it stays cheap to move around in state.
#[derive(Clone, Debug)]
pub struct Config(pub Box<TimelineConfig>);

impl Config {
    fn inner(&self) -> &TimelineConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = TimelineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.inner().upload_dir
    }

    pub fn upload_url_prefix(&self) -> &str {
        &self.inner().processing.upload_url_prefix
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().processing.max_upload_size_bytes
    }

    pub fn processing(&self) -> &ProcessingConfig {
        &self.inner().processing
    }
}

impl TimelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins: parse_list(&cors_origins_str),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env_or("JWT_EXPIRY_HOURS", JWT_EXPIRY_HOURS),
            environment,
        };

        let max_upload_size_mb: usize = env_or("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB);

        let processing = ProcessingConfig {
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            probe_timeout: Duration::from_secs(env_or("PROBE_TIMEOUT_SECS", PROBE_TIMEOUT_SECS)),
            rotation_probe_timeout: Duration::from_secs(env_or(
                "ROTATION_PROBE_TIMEOUT_SECS",
                ROTATION_PROBE_TIMEOUT_SECS,
            )),
            transcode_timeout: Duration::from_secs(env_or(
                "TRANSCODE_TIMEOUT_SECS",
                TRANSCODE_TIMEOUT_SECS,
            )),
            orientation_timeout: Duration::from_secs(env_or(
                "ORIENTATION_TIMEOUT_SECS",
                ORIENTATION_TIMEOUT_SECS,
            )),
            compatible_codec: env::var("VIDEO_COMPATIBLE_CODEC")
                .unwrap_or_else(|_| COMPATIBLE_CODEC.to_string())
                .trim()
                .to_lowercase(),
            transcode_codecs: parse_list(
                &env::var("VIDEO_TRANSCODE_CODECS").unwrap_or_else(|_| TRANSCODE_CODECS.to_string()),
            ),
            upload_url_prefix: env::var("UPLOAD_URL_PREFIX")
                .unwrap_or_else(|_| UPLOAD_URL_PREFIX.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
        };

        Ok(TimelineConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| UPLOAD_DIR.to_string()),
            ),
            processing,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !(self.database_url.starts_with("postgresql://")
            || self.database_url.starts_with("postgres://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.processing.compatible_codec.is_empty() {
            return Err(anyhow::anyhow!("VIDEO_COMPATIBLE_CODEC must not be empty"));
        }

        if self.processing.needs_transcode(&self.processing.compatible_codec) {
            return Err(anyhow::anyhow!(
                "VIDEO_TRANSCODE_CODECS must not contain the compatible codec '{}'",
                self.processing.compatible_codec
            ));
        }

        if self.processing.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        Ok(())
    }
}

fn env_or<T: std::str::FromStr + ToString>(key: &str, default: T) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

/// Split a comma-separated setting into trimmed, lowercased, non-empty entries.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
