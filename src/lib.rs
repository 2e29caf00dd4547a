//! Pickup Room - Pickup-game organizer service
//!
//! This crate organizes pickup games: a fixed-layout matchmaking queue with
//! ready-up handling, automatic game launching with friendship-aware team
//! assignment, join monitoring, and substitute coordination with escalating
//! cooldowns.

pub mod config;
pub mod error;
pub mod events;
pub mod games;
pub mod logs;
pub mod maps;
pub mod metrics;
pub mod players;
pub mod queue;
pub mod types;
pub mod utils;

mod timers;

// Re-export commonly used types and traits
pub use error::{DenyReason, PickupError, Result};
pub use types::*;

// Re-export key components
pub use events::EventBus;
pub use games::{GameManager, ReplacementCoordinator};
pub use queue::{AutoLauncher, FriendshipRegistry, QueueEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
