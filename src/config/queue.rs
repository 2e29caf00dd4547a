//! Queue configuration: slot layout, ready-up policies, admission policy

use crate::types::{GameClass, QueueSlot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A block of identical class-typed slots in the queue layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLayoutEntry {
    pub game_class: GameClass,
    pub count: usize,
    /// Classes occupants of these slots may be paired with by a friendship.
    /// `None` means no restriction.
    #[serde(default)]
    pub can_make_friends_with: Option<Vec<GameClass>>,
}

/// Queue-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Time players have to ready up before they are kicked out of the queue
    pub ready_up_timeout_ms: u64,
    /// Time the queue stays in the ready-up state before going back to the
    /// waiting state, unless all players ready up
    pub ready_state_timeout_ms: u64,
    /// How many recently played maps cannot be picked again
    pub map_cooldown: usize,
    /// Deny queueing to players that have no skill assigned at all
    pub deny_players_with_no_skill_assigned: bool,
    /// Per-class minimum skill required to take a slot of that class
    pub minimum_skill_thresholds: HashMap<GameClass, i64>,
    /// Fixed slot layout, defined at startup
    pub slot_layout: Vec<SlotLayoutEntry>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ready_up_timeout_ms: 40 * 1000,
            ready_state_timeout_ms: 60 * 1000,
            map_cooldown: 2,
            deny_players_with_no_skill_assigned: false,
            minimum_skill_thresholds: HashMap::new(),
            slot_layout: sixes_layout(),
        }
    }
}

impl QueueConfig {
    pub fn ready_up_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_up_timeout_ms)
    }

    pub fn ready_state_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_state_timeout_ms)
    }

    /// Materialize the fixed slot set from the layout
    pub fn build_slots(&self) -> Vec<QueueSlot> {
        let mut slots = Vec::new();
        let mut next_id = 0u64;
        for entry in &self.slot_layout {
            for _ in 0..entry.count {
                slots.push(QueueSlot {
                    id: next_id,
                    game_class: entry.game_class,
                    player_id: None,
                    ready: false,
                    can_make_friends_with: entry.can_make_friends_with.clone(),
                });
                next_id += 1;
            }
        }
        slots
    }

    pub fn slot_count(&self) -> usize {
        self.slot_layout.iter().map(|entry| entry.count).sum()
    }
}

/// The standard 6v6 layout: 4 scouts, 4 soldiers, 2 demomen and 2 medics,
/// medics eligible for friendships with the damage classes.
pub fn sixes_layout() -> Vec<SlotLayoutEntry> {
    vec![
        SlotLayoutEntry {
            game_class: GameClass::Scout,
            count: 4,
            can_make_friends_with: None,
        },
        SlotLayoutEntry {
            game_class: GameClass::Soldier,
            count: 4,
            can_make_friends_with: None,
        },
        SlotLayoutEntry {
            game_class: GameClass::Demoman,
            count: 2,
            can_make_friends_with: None,
        },
        SlotLayoutEntry {
            game_class: GameClass::Medic,
            count: 2,
            can_make_friends_with: Some(vec![
                GameClass::Scout,
                GameClass::Soldier,
                GameClass::Demoman,
            ]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = QueueConfig::default();
        assert_eq!(config.ready_up_timeout(), Duration::from_secs(40));
        assert_eq!(config.ready_state_timeout(), Duration::from_secs(60));
        assert_eq!(config.map_cooldown, 2);
        assert!(!config.deny_players_with_no_skill_assigned);
    }

    #[test]
    fn test_build_slots_from_sixes_layout() {
        let config = QueueConfig::default();
        let slots = config.build_slots();

        assert_eq!(slots.len(), 12);
        assert_eq!(config.slot_count(), 12);

        // Ids are dense and stable.
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.id, i as u64);
            assert!(slot.player_id.is_none());
            assert!(!slot.ready);
        }

        let medics: Vec<_> = slots
            .iter()
            .filter(|s| s.game_class == GameClass::Medic)
            .collect();
        assert_eq!(medics.len(), 2);
        for medic in medics {
            let allowed = medic.can_make_friends_with.as_ref().unwrap();
            assert!(allowed.contains(&GameClass::Scout));
            assert!(allowed.contains(&GameClass::Soldier));
            assert!(allowed.contains(&GameClass::Demoman));
        }
    }
}
