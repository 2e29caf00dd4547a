//! Configuration management for the pickup-room service

pub mod app;
pub mod game;
pub mod queue;

pub use app::{validate_config, AppConfig, ServiceSettings};
pub use game::GameConfig;
pub use queue::{sixes_layout, QueueConfig, SlotLayoutEntry};
