//! Data models for the application
//!
//! Organized by domain; everything is re-exported for convenient imports.

mod instance;
mod item;
mod timeline;
mod upload;
mod user;

pub use instance::*;
pub use item::*;
pub use timeline::*;
pub use upload::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// For PATCH fields: absent stays `None`, an explicit `null` becomes
/// `Some(None)`. Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
