//! Matchmaking queue: slots, ready-up state machine, friendships and the
//! auto launcher

pub mod engine;
pub mod friends;
pub mod launcher;

pub use engine::{QueueEngine, QueueSnapshot};
pub use friends::{resolve, FriendshipRegistry};
pub use launcher::AutoLauncher;
