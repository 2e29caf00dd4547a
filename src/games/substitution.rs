//! Substitute intake and cooldown escalation
//!
//! A slot opened by the lifecycle manager can be taken by any admitted
//! player. The player who abandoned the slot receives an escalating
//! cooldown ban; taking back one's own slot is a rejoin and issues no ban.

use crate::config::GameConfig;
use crate::error::{DenyReason, PickupError, Result};
use crate::events::messages::{Event, PlayerReplaced};
use crate::events::EventBus;
use crate::games::instance::{Game, SlotStatus};
use crate::games::manager::GamesCore;
use crate::metrics::MetricsCollector;
use crate::players::{AdmissionGuard, GuardContext, PlayerDirectory, Verdict};
use crate::types::{Ban, GameId, PlayerId};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Coordinates substitutions for slots waiting on a replacement
#[derive(Clone)]
pub struct ReplacementCoordinator {
    core: Arc<Mutex<GamesCore>>,
    players: Arc<PlayerDirectory>,
    guard: Arc<dyn AdmissionGuard>,
    bus: Arc<EventBus>,
    metrics: Arc<MetricsCollector>,
    config: GameConfig,
}

impl ReplacementCoordinator {
    /// Build a coordinator sharing the manager's game store
    pub fn new(
        manager: &crate::games::GameManager,
        guard: Arc<dyn AdmissionGuard>,
    ) -> Self {
        Self {
            core: manager.core.clone(),
            players: manager.players.clone(),
            guard,
            bus: manager.bus.clone(),
            metrics: manager.metrics.clone(),
            config: manager.config.clone(),
        }
    }

    /// Fill the replacee's open slot with the replacement player.
    ///
    /// The replacee is cooled down unless they are taking their own slot
    /// back. Escalation counts every previous cooldown, expired or not.
    pub fn replace(
        &self,
        game_id: GameId,
        replacee_id: &PlayerId,
        replacement_id: &PlayerId,
    ) -> Result<Game> {
        let replacement = self.players.get(replacement_id)?;

        let (game, event, rejoined) = {
            let mut core = self.lock_core();
            let live = core
                .games
                .get_mut(&game_id)
                .ok_or(PickupError::GameNotFound { game_id })?;
            if !live.game.is_live() {
                return Err(PickupError::SlotNotSubstitutable {
                    player_id: replacee_id.clone(),
                }
                .into());
            }

            let slot_index = live
                .game
                .slots
                .iter()
                .position(|slot| {
                    &slot.player_id == replacee_id
                        && slot.status == SlotStatus::WaitingForSubstitute
                })
                .ok_or_else(|| PickupError::SlotNotSubstitutable {
                    player_id: replacee_id.clone(),
                })?;

            let rejoined = replacee_id == replacement_id;
            if !rejoined {
                // A player cannot hold two slots of one game; substitutes
                // from other games are still fine.
                if live
                    .game
                    .slots
                    .iter()
                    .any(|slot| &slot.player_id == replacement_id)
                {
                    return Err(PickupError::PlayerDenied {
                        player_id: replacement_id.clone(),
                        reason: DenyReason::PlayerIsInvolvedInGame,
                    }
                    .into());
                }

                let context = GuardContext::ReplacePlayer {
                    game_class: live.game.slots[slot_index].game_class,
                };
                if let Verdict::Deny(reason) = self.guard.evaluate(&replacement, &context) {
                    return Err(PickupError::PlayerDenied {
                        player_id: replacement_id.clone(),
                        reason,
                    }
                    .into());
                }

                let slot = &mut live.game.slots[slot_index];
                let mut archived = slot.clone();
                archived.status = SlotStatus::Replaced;
                slot.player_id = replacement_id.clone();
                live.game.replaced_slots.push(archived);
            }

            let slot = &mut live.game.slots[slot_index];
            slot.status = SlotStatus::Joined;
            slot.connected = true;

            let event = Event::PlayerReplaced(PlayerReplaced {
                game_id,
                replacee_id: replacee_id.clone(),
                replacement_id: replacement_id.clone(),
                game_class: slot.game_class,
                team: slot.team,
                timestamp: crate::utils::current_timestamp(),
            });
            (live.game.clone(), event, rejoined)
        };

        if rejoined {
            info!(game_id = %game_id, player_id = %replacee_id, "player took their own slot back");
        } else {
            info!(
                game_id = %game_id,
                replacee_id = %replacee_id,
                replacement_id = %replacement_id,
                "player substituted"
            );
            if let Err(e) = self.players.set_active_game(replacement_id, game_id) {
                warn!(player_id = %replacement_id, error = %e, "failed to set active game");
            }
            if let Err(e) = self.players.clear_active_game(replacee_id) {
                warn!(player_id = %replacee_id, error = %e, "failed to clear active game");
            }
            if let Err(e) = self.cool_down(replacee_id) {
                warn!(player_id = %replacee_id, error = %e, "failed to issue cooldown");
            }
            self.metrics.players_replaced_total.inc();
        }

        self.bus.publish(event);
        Ok(game)
    }

    /// Issue the next cooldown ban for a player who abandoned their slot
    fn cool_down(&self, player_id: &PlayerId) -> Result<()> {
        let level = self.players.cooldown_ban_count(player_id)?;
        let now = crate::utils::current_timestamp();
        let duration = self.config.cooldown_for_level(level);
        info!(
            player_id = %player_id,
            level,
            minutes = duration.num_minutes(),
            "issuing cooldown"
        );
        self.players.add_ban(Ban {
            player_id: player_id.clone(),
            reason: format!("Cooldown level {}", level),
            start: now,
            end: now + duration,
        })?;
        self.metrics.cooldowns_issued_total.inc();
        Ok(())
    }

    fn lock_core(&self) -> MutexGuard<'_, GamesCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }
}
