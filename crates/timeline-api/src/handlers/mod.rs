pub mod auth;
pub mod health;
pub mod instances;
pub mod media;
pub mod occurrences;
pub mod timelines;
pub mod upload;
