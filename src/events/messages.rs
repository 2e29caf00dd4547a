//! Event topics and payloads carried by the in-process bus

use crate::types::{Friendship, GameClass, GameId, PlayerId, QueueState, SubstituteRequest, Team};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enumerated topic set for the bus.
///
/// Subscribers register per topic; ordering is only guaranteed within a
/// single topic's subscriber list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    QueueStateChanged,
    GameCreated,
    GameStateChanged,
    GameEnded,
    PlayerJoinedGameServer,
    PlayerJoinedTeam,
    SubstituteAvailable,
    PlayerReplaced,
    LogsUploaded,
}

/// Queue transitioned to a new state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStateChanged {
    pub state: QueueState,
    pub timestamp: DateTime<Utc>,
}

/// A game was created from a launching queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCreated {
    pub game_id: GameId,
    pub game_number: u64,
    pub map: String,
    pub friendships: Vec<Friendship>,
    pub timestamp: DateTime<Utc>,
}

/// A game moved between lifecycle states
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateChanged {
    pub game_id: GameId,
    pub state: crate::games::instance::GameState,
    pub timestamp: DateTime<Utc>,
}

/// A game reached its terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEnded {
    pub game_id: GameId,
    /// True when an admin force-ended the game rather than it ending naturally
    pub forced: bool,
    pub timestamp: DateTime<Utc>,
}

/// External signal: a player connected to the allocated game server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedGameServer {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub ip_address: Option<String>,
}

/// External signal: a connected player picked their team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedTeam {
    pub game_id: GameId,
    pub player_id: PlayerId,
}

/// A game slot needs a replacement player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteAvailable {
    pub request: SubstituteRequest,
    pub player_id: PlayerId,
    pub timestamp: DateTime<Utc>,
}

/// A substitution was executed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerReplaced {
    pub game_id: GameId,
    pub replacee_id: PlayerId,
    pub replacement_id: PlayerId,
    pub game_class: GameClass,
    pub team: Team,
    pub timestamp: DateTime<Utc>,
}

/// Logs for a finished game were archived externally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsUploaded {
    pub game_id: GameId,
    pub logs_url: String,
    pub timestamp: DateTime<Utc>,
}

/// Union of everything that can travel over the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    QueueStateChanged(QueueStateChanged),
    GameCreated(GameCreated),
    GameStateChanged(GameStateChanged),
    GameEnded(GameEnded),
    PlayerJoinedGameServer(PlayerJoinedGameServer),
    PlayerJoinedTeam(PlayerJoinedTeam),
    SubstituteAvailable(SubstituteAvailable),
    PlayerReplaced(PlayerReplaced),
    LogsUploaded(LogsUploaded),
}

impl Event {
    /// The topic this event is delivered on
    pub fn topic(&self) -> Topic {
        match self {
            Event::QueueStateChanged(_) => Topic::QueueStateChanged,
            Event::GameCreated(_) => Topic::GameCreated,
            Event::GameStateChanged(_) => Topic::GameStateChanged,
            Event::GameEnded(_) => Topic::GameEnded,
            Event::PlayerJoinedGameServer(_) => Topic::PlayerJoinedGameServer,
            Event::PlayerJoinedTeam(_) => Topic::PlayerJoinedTeam,
            Event::SubstituteAvailable(_) => Topic::SubstituteAvailable,
            Event::PlayerReplaced(_) => Topic::PlayerReplaced,
            Event::LogsUploaded(_) => Topic::LogsUploaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueueState;

    #[test]
    fn test_event_topic_mapping() {
        let event = Event::QueueStateChanged(QueueStateChanged {
            state: QueueState::Waiting,
            timestamp: crate::utils::current_timestamp(),
        });
        assert_eq!(event.topic(), Topic::QueueStateChanged);

        let event = Event::GameEnded(GameEnded {
            game_id: crate::utils::generate_game_id(),
            forced: true,
            timestamp: crate::utils::current_timestamp(),
        });
        assert_eq!(event.topic(), Topic::GameEnded);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = Event::QueueStateChanged(QueueStateChanged {
            state: QueueState::Launching,
            timestamp: crate::utils::current_timestamp(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"QueueStateChanged\""));
        assert!(json.contains("\"launching\""));
    }
}
