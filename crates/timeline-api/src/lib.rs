//! Timeline API Library
//!
//! HTTP handlers, authentication middleware and application setup.

mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
