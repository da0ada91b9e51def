//! Timeline Core Library
//!
//! Domain models, error types, configuration and the record-store contract
//! shared by every timeline component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod records;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ProcessingConfig, TimelineConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use records::{MediaRecordStore, NewMediaRecord};
