//! Game lifecycle: creation, join monitoring, substitution and teardown

pub mod instance;
pub mod manager;
pub mod provider;
pub mod substitution;

pub use instance::{assign_teams, Game, GameSlot, GameState, SlotStatus};
pub use manager::GameManager;
pub use provider::{GameServerProvider, NoopGameServerProvider};
pub use substitution::ReplacementCoordinator;
