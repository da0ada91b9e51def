//! Postgres persistence for timelines, their items, instances and media records

pub mod db;

pub use db::{
    InstanceRepository, MediaRepository, TimelineItemRepository, TimelineRepository,
    UserRepository,
};
