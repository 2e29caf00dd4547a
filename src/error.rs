//! Error types for the pickup-game organizer
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application, plus the typed admission-denial taxonomy.

use crate::types::{GameId, PlayerId};
use serde::{Deserialize, Serialize};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Why an admission guard refused a player.
///
/// These are structured verdicts, not failures: they are surfaced to the
/// caller as-is and never abort the component that asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DenyReason {
    PlayerHasNotAcceptedRules,
    PlayerSkillTooLow,
    NoSkillAssigned,
    PlayerIsBanned,
    PlayerIsInvolvedInGame,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DenyReason::PlayerHasNotAcceptedRules => "player has not accepted rules",
            DenyReason::PlayerSkillTooLow => "player skill too low",
            DenyReason::NoSkillAssigned => "no skill assigned",
            DenyReason::PlayerIsBanned => "player is banned",
            DenyReason::PlayerIsInvolvedInGame => "player is involved in a game",
        };
        write!(f, "{}", text)
    }
}

/// Custom error types for specific queue and game scenarios
#[derive(Debug, thiserror::Error)]
pub enum PickupError {
    #[error("slot {slot_id} is already occupied")]
    SlotOccupied { slot_id: u64 },

    #[error("slot {slot_id} does not exist")]
    SlotNotFound { slot_id: u64 },

    #[error("player {player_id} is already queued")]
    PlayerAlreadyQueued { player_id: PlayerId },

    #[error("player {player_id} is not in the queue")]
    PlayerNotQueued { player_id: PlayerId },

    #[error("player {player_id} denied: {reason}")]
    PlayerDenied {
        player_id: PlayerId,
        reason: DenyReason,
    },

    #[error("player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("game not found: {game_id}")]
    GameNotFound { game_id: GameId },

    #[error("player {player_id} has no slot waiting for a substitute")]
    SlotNotSubstitutable { player_id: PlayerId },

    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("internal service error: {message}")]
    InternalError { message: String },
}
