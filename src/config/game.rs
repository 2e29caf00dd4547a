//! Game configuration: join monitoring timeouts and the cooldown policy

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Game-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Time a player has to join the game server and their team after launch
    pub join_gameserver_timeout_ms: u64,
    /// Time a disconnected player has to reconnect before being substituted
    pub rejoin_gameserver_timeout_ms: u64,
    /// Cooldown duration per escalation level, in minutes. Levels beyond the
    /// last entry are clamped to it.
    pub cooldown_level_minutes: Vec<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            join_gameserver_timeout_ms: 5 * 60 * 1000,
            rejoin_gameserver_timeout_ms: 3 * 60 * 1000,
            cooldown_level_minutes: vec![5, 30, 120, 360, 24 * 60],
        }
    }
}

impl GameConfig {
    pub fn join_gameserver_timeout(&self) -> Duration {
        Duration::from_millis(self.join_gameserver_timeout_ms)
    }

    pub fn rejoin_gameserver_timeout(&self) -> Duration {
        Duration::from_millis(self.rejoin_gameserver_timeout_ms)
    }

    /// Cooldown duration for a given escalation level, clamped to the policy's
    /// last entry
    pub fn cooldown_for_level(&self, level: usize) -> ChronoDuration {
        let minutes = if self.cooldown_level_minutes.is_empty() {
            0
        } else {
            let index = level.min(self.cooldown_level_minutes.len() - 1);
            self.cooldown_level_minutes[index]
        };
        ChronoDuration::minutes(minutes as i64)
    }
}
