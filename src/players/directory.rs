//! In-memory player directory
//!
//! Owns player records: identity, per-class skill, rules acceptance,
//! active-game reference and ban history. The queue engine reads from it
//! through the admission guard; the game manager and the replacement
//! coordinator write active-game references and bans.

use crate::error::{PickupError, Result};
use crate::types::{Ban, GameClass, GameId, Player, PlayerId};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Thread-safe registry of known players
#[derive(Default)]
pub struct PlayerDirectory {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a player record
    pub fn upsert(&self, player: Player) {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        players.insert(player.id.clone(), player);
    }

    /// Look a player up by id
    pub fn get(&self, player_id: &PlayerId) -> Result<Player> {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players
            .get(player_id)
            .cloned()
            .ok_or_else(|| {
                PickupError::PlayerNotFound {
                    player_id: player_id.clone(),
                }
                .into()
            })
    }

    /// Assign a skill rating for one class
    pub fn set_skill(&self, player_id: &PlayerId, game_class: GameClass, rating: i64) -> Result<()> {
        self.update(player_id, |player| {
            player
                .skill
                .get_or_insert_with(HashMap::new)
                .insert(game_class, rating);
        })
    }

    /// Point the player at the game they are now part of
    pub fn set_active_game(&self, player_id: &PlayerId, game_id: GameId) -> Result<()> {
        self.update(player_id, |player| {
            player.active_game = Some(game_id);
        })
    }

    /// Clear the player's active-game reference
    pub fn clear_active_game(&self, player_id: &PlayerId) -> Result<()> {
        self.update(player_id, |player| {
            player.active_game = None;
        })
    }

    /// Append a ban to the player's history
    pub fn add_ban(&self, ban: Ban) -> Result<()> {
        debug!(player_id = %ban.player_id, reason = %ban.reason, "recording ban");
        self.update(&ban.player_id.clone(), |player| {
            player.bans.push(ban);
        })
    }

    /// How many cooldown bans the player has accumulated, active or not.
    /// This drives the escalation level of the next cooldown.
    pub fn cooldown_ban_count(&self, player_id: &PlayerId) -> Result<usize> {
        let player = self.get(player_id)?;
        Ok(player
            .bans
            .iter()
            .filter(|ban| ban.reason.starts_with("Cooldown level"))
            .count())
    }

    fn update<F>(&self, player_id: &PlayerId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Player),
    {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        let player = players.get_mut(player_id).ok_or(PickupError::PlayerNotFound {
            player_id: player_id.clone(),
        })?;
        mutate(player);
        Ok(())
    }
}
