//! Database repositories
//!
//! One repository per table family. Each wraps a cloned `PgPool` and maps
//! sqlx errors into `AppError` with `?`.

pub mod instance;
pub mod item;
pub mod media;
pub mod timeline;
pub mod user;

pub use instance::InstanceRepository;
pub use item::TimelineItemRepository;
pub use media::MediaRepository;
pub use timeline::TimelineRepository;
pub use user::UserRepository;
