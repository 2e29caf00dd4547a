//! Admission guard: pluggable authorization checks
//!
//! A guard decides whether a player may take a queue slot or a substitute
//! spot. Checks run in a fixed order (rules, skill, bans, game involvement)
//! and return a tagged verdict instead of failing, so callers surface the
//! exact reason to the player.

use crate::config::QueueConfig;
use crate::error::DenyReason;
use crate::types::{GameClass, Player};

/// Where the admission decision is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardContext {
    /// Player wants to take a queue slot of this class
    JoinQueue { game_class: GameClass },
    /// Player wants to take a substitute spot of this class
    ReplacePlayer { game_class: GameClass },
}

impl GuardContext {
    fn game_class(&self) -> GameClass {
        match self {
            GuardContext::JoinQueue { game_class } => *game_class,
            GuardContext::ReplacePlayer { game_class } => *game_class,
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
}

/// Admission guard interface, injected into the queue engine and the
/// replacement coordinator
#[cfg_attr(test, mockall::automock)]
pub trait AdmissionGuard: Send + Sync {
    fn evaluate(&self, player: &Player, context: &GuardContext) -> Verdict;
}

/// The default policy-driven guard
pub struct PolicyAdmissionGuard {
    deny_players_with_no_skill_assigned: bool,
    minimum_skill_thresholds: std::collections::HashMap<GameClass, i64>,
}

impl PolicyAdmissionGuard {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            deny_players_with_no_skill_assigned: config.deny_players_with_no_skill_assigned,
            minimum_skill_thresholds: config.minimum_skill_thresholds.clone(),
        }
    }

    fn check_skill(&self, player: &Player, game_class: GameClass) -> Option<DenyReason> {
        match &player.skill {
            Some(skill) => {
                let threshold = self
                    .minimum_skill_thresholds
                    .get(&game_class)
                    .copied()
                    .unwrap_or(0);
                let rating = skill.get(&game_class).copied().unwrap_or(0);
                if rating < threshold {
                    Some(DenyReason::PlayerSkillTooLow)
                } else {
                    None
                }
            }
            None if self.deny_players_with_no_skill_assigned => {
                Some(DenyReason::NoSkillAssigned)
            }
            None => None,
        }
    }
}

impl AdmissionGuard for PolicyAdmissionGuard {
    fn evaluate(&self, player: &Player, context: &GuardContext) -> Verdict {
        if !player.has_accepted_rules {
            return Verdict::Deny(DenyReason::PlayerHasNotAcceptedRules);
        }

        if let Some(reason) = self.check_skill(player, context.game_class()) {
            return Verdict::Deny(reason);
        }

        if !player.active_bans().is_empty() {
            return Verdict::Deny(DenyReason::PlayerIsBanned);
        }

        // Substitutes are allowed to come from another game's roster; only
        // the queue refuses already-involved players.
        if matches!(context, GuardContext::JoinQueue { .. }) && player.active_game.is_some() {
            return Verdict::Deny(DenyReason::PlayerIsInvolvedInGame);
        }

        Verdict::Allow
    }
}
