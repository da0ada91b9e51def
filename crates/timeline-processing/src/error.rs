use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use timeline_core::AppError;
use timeline_storage::StorageError;

use crate::process::ProcessError;

/// Which adapter a tool failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Probe,
    Transcode,
    Orientation,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Probe => "probe",
            ToolKind::Transcode => "transcode",
            ToolKind::Orientation => "orientation fix",
        };
        f.write_str(name)
    }
}

/// Failure of a single external tool step. Never fatal to an upload.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: ToolKind, timeout: Duration },

    #[error("{tool} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        tool: ToolKind,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to start {tool}: {message}")]
    Spawn { tool: ToolKind, message: String },

    #[error("{tool} reported success but {} was not written", .path.display())]
    MissingOutput { tool: ToolKind, path: PathBuf },
}

impl ToolError {
    pub fn from_process(tool: ToolKind, err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout { timeout, .. } => ToolError::Timeout { tool, timeout },
            ProcessError::Spawn { source, .. } => ToolError::Spawn {
                tool,
                message: source.to_string(),
            },
        }
    }

    pub fn tool(&self) -> ToolKind {
        match self {
            ToolError::Timeout { tool, .. }
            | ToolError::NonZeroExit { tool, .. }
            | ToolError::Spawn { tool, .. }
            | ToolError::MissingOutput { tool, .. } => *tool,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::Timeout { .. })
    }
}

/// Errors that fail an upload request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Empty upload")]
    EmptyUpload,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Failed to write upload: {0}")]
    StorageWrite(#[from] StorageError),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyUpload => AppError::InvalidInput("Uploaded file is empty".to_string()),
            PipelineError::TooLarge { limit, .. } => AppError::PayloadTooLarge(format!(
                "File exceeds the maximum upload size of {} MB",
                limit / (1024 * 1024)
            )),
            PipelineError::StorageWrite(e) => AppError::Storage(e.to_string()),
        }
    }
}

/// Errors surfaced by derivative cleanup and reconciliation
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid served file name: {0}")]
    InvalidName(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Records(#[from] AppError),
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidName(name) => {
                AppError::InvalidInput(format!("Invalid file name: {}", name))
            }
            RegistryError::Storage(e) => AppError::Storage(e.to_string()),
            RegistryError::Records(e) => e,
        }
    }
}
