//! Game aggregate: slots, lifecycle state and team assignment

use crate::types::{Friendship, GameClass, GameId, PlayerId, QueueSlot, SlotId, SubstituteRequest, Team};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a game; `Ended` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    Launching,
    Started,
    Ended,
}

/// Status of one game slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotStatus {
    /// Waiting for the occupant to connect to the server and pick a team
    WaitingToJoin,
    /// Both join signals observed
    Joined,
    /// The occupant failed to join or stay; a substitute may take the slot
    WaitingForSubstitute,
    /// Archived record of an occupant who was substituted out
    Replaced,
}

/// A class-typed, team-assigned position in a game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSlot {
    pub id: SlotId,
    pub game_class: GameClass,
    pub team: Team,
    pub player_id: PlayerId,
    pub status: SlotStatus,
    /// Whether the first join signal (gameserver connection) was observed
    pub connected: bool,
}

/// One organized game, from creation through natural or forced end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// Monotonically increasing sequence number
    pub number: u64,
    pub map: String,
    pub state: GameState,
    pub created_at: DateTime<Utc>,
    pub slots: Vec<GameSlot>,
    /// Archived records of substituted-out occupants
    pub replaced_slots: Vec<GameSlot>,
    /// Opaque secret correlating external log lines with this game
    pub log_secret: String,
}

impl Game {
    pub fn new(number: u64, map: String, slots: Vec<GameSlot>) -> Self {
        Self {
            id: crate::utils::generate_game_id(),
            number,
            map,
            state: GameState::Launching,
            created_at: crate::utils::current_timestamp(),
            slots,
            replaced_slots: Vec::new(),
            log_secret: crate::utils::generate_log_secret(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.state != GameState::Ended
    }

    pub fn slot_of_player(&self, player_id: &PlayerId) -> Option<&GameSlot> {
        self.slots.iter().find(|slot| &slot.player_id == player_id)
    }

    pub fn slot_of_player_mut(&mut self, player_id: &PlayerId) -> Option<&mut GameSlot> {
        self.slots.iter_mut().find(|slot| &slot.player_id == player_id)
    }

    /// Views over every slot currently waiting for a substitute
    pub fn substitute_requests(&self) -> Vec<SubstituteRequest> {
        self.slots
            .iter()
            .filter(|slot| slot.status == SlotStatus::WaitingForSubstitute)
            .map(|slot| SubstituteRequest {
                game_id: self.id,
                game_number: self.number,
                game_class: slot.game_class,
                team: slot.team,
            })
            .collect()
    }
}

/// Assign queued players to teams, balancing per-class team counts while
/// keeping every validated friendship pair on one team.
///
/// Pairs are placed first, alternating onto the currently smaller team;
/// remaining players fill whichever team has fewer of their class.
pub fn assign_teams(slots: &[QueueSlot], friendships: &[Friendship]) -> Vec<GameSlot> {
    let occupied: Vec<(PlayerId, GameClass, SlotId)> = slots
        .iter()
        .filter_map(|slot| {
            slot.player_id
                .clone()
                .map(|player_id| (player_id, slot.game_class, slot.id))
        })
        .collect();

    let mut ledger = TeamLedger::default();

    // Friendship pairs first, so both members always land together.
    for friendship in friendships {
        let source = occupied
            .iter()
            .find(|(player, _, _)| *player == friendship.source_player_id);
        let target = occupied
            .iter()
            .find(|(player, _, _)| *player == friendship.target_player_id);
        let (Some((source_id, source_class, _)), Some((target_id, target_class, _))) =
            (source, target)
        else {
            continue;
        };

        let team = ledger.smaller_team();
        ledger.place(source_id.clone(), *source_class, team);
        ledger.place(target_id.clone(), *target_class, team);
    }

    // Everyone else balances their own class across the teams.
    for (player, game_class, _) in &occupied {
        if ledger.team_of.contains_key(player) {
            continue;
        }
        let team = ledger.team_for_class(*game_class);
        ledger.place(player.clone(), *game_class, team);
    }

    occupied
        .into_iter()
        .map(|(player, game_class, slot_id)| {
            let team = ledger.team_of[&player];
            GameSlot {
                id: slot_id,
                game_class,
                team,
                player_id: player,
                status: SlotStatus::WaitingToJoin,
                connected: false,
            }
        })
        .collect()
}

#[derive(Default)]
struct TeamLedger {
    team_of: HashMap<PlayerId, Team>,
    class_counts: HashMap<(GameClass, Team), usize>,
    totals: HashMap<Team, usize>,
}

impl TeamLedger {
    fn place(&mut self, player: PlayerId, game_class: GameClass, team: Team) {
        self.team_of.insert(player, team);
        *self.class_counts.entry((game_class, team)).or_insert(0) += 1;
        *self.totals.entry(team).or_insert(0) += 1;
    }

    fn total(&self, team: Team) -> usize {
        self.totals.get(&team).copied().unwrap_or(0)
    }

    fn class_count(&self, game_class: GameClass, team: Team) -> usize {
        self.class_counts
            .get(&(game_class, team))
            .copied()
            .unwrap_or(0)
    }

    fn smaller_team(&self) -> Team {
        if self.total(Team::Blu) <= self.total(Team::Red) {
            Team::Blu
        } else {
            Team::Red
        }
    }

    /// The team with fewer players of this class; overall size breaks ties
    fn team_for_class(&self, game_class: GameClass) -> Team {
        let blu = self.class_count(game_class, Team::Blu);
        let red = self.class_count(game_class, Team::Red);
        if blu < red {
            Team::Blu
        } else if red < blu {
            Team::Red
        } else {
            self.smaller_team()
        }
    }
}
