//! Flat on-disk store for uploaded media
//!
//! Every upload and every derivative lives directly in one directory and is
//! addressed by its file name. Names handed out by [`LocalStorage::persist`]
//! are `{uuid}_{sanitized original}`, so concurrent uploads never collide.

mod error;
mod local;
mod naming;

pub use error::{StorageError, StorageResult};
pub use local::{LocalStorage, StoredFile};
pub use naming::{sanitize_filename, unique_name};
