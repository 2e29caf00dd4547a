//! Common types used throughout the pickup-game organizer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for players (external platform id)
pub type PlayerId = String;

/// Unique identifier for games
pub type GameId = Uuid;

/// Identifier of a queue or game slot
pub type SlotId = u64;

/// The class a slot requires its occupant to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameClass {
    Scout,
    Soldier,
    Pyro,
    Demoman,
    Heavy,
    Engineer,
    Medic,
    Sniper,
    Spy,
}

impl std::fmt::Display for GameClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameClass::Scout => "scout",
            GameClass::Soldier => "soldier",
            GameClass::Pyro => "pyro",
            GameClass::Demoman => "demoman",
            GameClass::Heavy => "heavy",
            GameClass::Engineer => "engineer",
            GameClass::Medic => "medic",
            GameClass::Sniper => "sniper",
            GameClass::Spy => "spy",
        };
        write!(f, "{}", name)
    }
}

/// Team a game slot is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Blu,
    Red,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::Blu => Team::Red,
            Team::Red => Team::Blu,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Blu => write!(f, "blu"),
            Team::Red => write!(f, "red"),
        }
    }
}

/// A time-bounded penalty issued to a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    pub player_id: PlayerId,
    pub reason: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Ban {
    /// Whether the ban is in effect at the given instant
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && self.end > now
    }
}

/// A registered player, as held by the player directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Per-class skill ratings. `None` means no skill was ever assigned;
    /// individual class entries may be missing.
    pub skill: Option<HashMap<GameClass, i64>>,
    pub has_accepted_rules: bool,
    /// The game this player is currently part of, if any
    pub active_game: Option<GameId>,
    pub bans: Vec<Ban>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            skill: None,
            has_accepted_rules: false,
            active_game: None,
            bans: Vec::new(),
        }
    }

    /// Bans still in effect right now
    pub fn active_bans(&self) -> Vec<&Ban> {
        let now = crate::utils::current_timestamp();
        self.bans.iter().filter(|b| b.is_active_at(now)).collect()
    }
}

/// A class-typed position in the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSlot {
    pub id: SlotId,
    pub game_class: GameClass,
    pub player_id: Option<PlayerId>,
    pub ready: bool,
    /// Classes this occupant may be paired with by a friendship.
    /// `None` means no restriction.
    pub can_make_friends_with: Option<Vec<GameClass>>,
}

impl QueueSlot {
    pub fn is_occupied(&self) -> bool {
        self.player_id.is_some()
    }
}

/// State of the queue as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueState {
    /// Waiting for players to fill the slots
    Waiting,
    /// All slots occupied; players must confirm before launch
    ReadyUp,
    /// Every slot occupied and ready; a game is being created
    Launching,
}

/// A request that two players end up on the same team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub source_player_id: PlayerId,
    pub target_player_id: PlayerId,
}

/// A visible signal that a game slot needs a replacement player.
///
/// Derived view over a slot in the waiting-for-substitute status;
/// recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstituteRequest {
    pub game_id: GameId,
    pub game_number: u64,
    pub game_class: GameClass,
    pub team: Team,
}
