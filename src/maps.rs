//! Map selection for launched games
//!
//! The rotation picker cycles through a pool while refusing to repeat any
//! of the most recently played maps.

use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// Chooses the map for the next launched game
pub trait MapPicker: Send + Sync {
    fn pick(&self) -> String;
}

/// Pool-based picker excluding the N most recently played maps
pub struct RotationMapPicker {
    pool: Vec<String>,
    cooldown: usize,
    recent: Mutex<VecDeque<String>>,
}

impl RotationMapPicker {
    /// `cooldown` is how many of the last picks may not repeat. It is
    /// capped below the pool size so a pick always exists.
    pub fn new(pool: Vec<String>, cooldown: usize) -> Self {
        let cooldown = if pool.is_empty() {
            0
        } else {
            cooldown.min(pool.len() - 1)
        };
        Self {
            pool,
            cooldown,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn sixes_pool() -> Vec<String> {
        [
            "cp_badlands",
            "cp_process_final",
            "cp_snakewater_final1",
            "cp_gullywash_final1",
            "cp_granary_pro",
        ]
        .iter()
        .map(|map| map.to_string())
        .collect()
    }
}

impl MapPicker for RotationMapPicker {
    fn pick(&self) -> String {
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        let choice = self
            .pool
            .iter()
            .find(|map| !recent.contains(map))
            .cloned()
            .unwrap_or_else(|| "cp_badlands".to_string());

        recent.push_back(choice.clone());
        while recent.len() > self.cooldown {
            recent.pop_front();
        }
        debug!(map = %choice, "map picked");
        choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_maps_are_excluded() {
        let picker = RotationMapPicker::new(RotationMapPicker::sixes_pool(), 2);
        let first = picker.pick();
        let second = picker.pick();
        let third = picker.pick();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_ne!(first, third);
        // With the cooldown window slid past it, the first map returns.
        assert_eq!(picker.pick(), first);
    }

    #[test]
    fn test_zero_cooldown_repeats_freely() {
        let picker = RotationMapPicker::new(vec!["cp_badlands".to_string()], 0);
        assert_eq!(picker.pick(), "cp_badlands");
        assert_eq!(picker.pick(), "cp_badlands");
    }

    #[test]
    fn test_cooldown_capped_below_pool_size() {
        let pool = vec!["cp_badlands".to_string(), "cp_process_final".to_string()];
        let picker = RotationMapPicker::new(pool, 10);
        // A pick always succeeds even though the requested cooldown exceeds
        // the pool.
        for _ in 0..5 {
            assert!(!picker.pick().is_empty());
        }
    }

    #[test]
    fn test_empty_pool_falls_back() {
        let picker = RotationMapPicker::new(vec![], 2);
        assert_eq!(picker.pick(), "cp_badlands");
    }
}
