//! Friendships: player-initiated same-team pairing requests
//!
//! Proposals are collected in a registry while players queue; validity is
//! only decided at launch time, when `resolve` prunes the raw proposals
//! against the queue's slot compatibility lists.

use crate::types::{Friendship, PlayerId, QueueSlot};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

/// Stores raw friendship proposals keyed by proposer.
///
/// Re-marking replaces the proposer's previous target; `None` clears it.
#[derive(Default)]
pub struct FriendshipRegistry {
    proposals: RwLock<Vec<Friendship>>,
}

impl FriendshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or clear) the proposer's pairing request
    pub fn mark_friend(&self, source: &PlayerId, target: Option<PlayerId>) {
        let mut proposals = self.proposals.write().unwrap_or_else(|e| e.into_inner());
        proposals.retain(|f| &f.source_player_id != source);
        if let Some(target) = target {
            debug!(source = %source, target = %target, "friendship proposed");
            proposals.push(Friendship {
                source_player_id: source.clone(),
                target_player_id: target,
            });
        }
    }

    /// All current proposals, in the order they were made
    pub fn proposals(&self) -> Vec<Friendship> {
        self.proposals
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.proposals
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Prune raw proposals into a conflict-free set of valid friendships.
///
/// A proposal survives when both players are queued, each slot's
/// compatibility list permits the other player's class (an absent list
/// permits everything), and neither player is already part of an earlier
/// retained pair. Later conflicting proposals are dropped silently.
pub fn resolve(proposed: &[Friendship], slots: &[QueueSlot]) -> Vec<Friendship> {
    let by_player: HashMap<&str, &QueueSlot> = slots
        .iter()
        .filter_map(|slot| {
            slot.player_id
                .as_deref()
                .map(|player_id| (player_id, slot))
        })
        .collect();

    let mut paired: HashSet<&str> = HashSet::new();
    let mut valid = Vec::new();

    for friendship in proposed {
        let source = friendship.source_player_id.as_str();
        let target = friendship.target_player_id.as_str();
        if source == target {
            continue;
        }

        let (Some(source_slot), Some(target_slot)) =
            (by_player.get(source), by_player.get(target))
        else {
            continue;
        };

        if !permits(source_slot, target_slot.game_class)
            || !permits(target_slot, source_slot.game_class)
        {
            continue;
        }

        if paired.contains(source) || paired.contains(target) {
            continue;
        }

        paired.insert(source);
        paired.insert(target);
        valid.push(friendship.clone());
    }

    valid
}

fn permits(slot: &QueueSlot, other_class: crate::types::GameClass) -> bool {
    match &slot.can_make_friends_with {
        Some(classes) => classes.contains(&other_class),
        None => true,
    }
}
