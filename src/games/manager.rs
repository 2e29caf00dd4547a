//! Game lifecycle manager
//!
//! Owns every created game: team assignment at creation, join monitoring,
//! rejoin monitoring after disconnects, and natural or forced termination.
//! All mutation goes through the aggregate lock; events and collaborator
//! calls are dispatched only after the lock is released.

use crate::config::GameConfig;
use crate::error::{PickupError, Result};
use crate::events::messages::{
    Event, GameCreated, GameEnded, GameStateChanged, SubstituteAvailable,
};
use crate::events::{EventBus, Topic};
use crate::games::instance::{assign_teams, Game, GameState, SlotStatus};
use crate::games::provider::GameServerProvider;
use crate::logs::LogUploader;
use crate::metrics::MetricsCollector;
use crate::players::PlayerDirectory;
use crate::timers::PendingTimer;
use crate::types::{Friendship, GameId, PlayerId, QueueSlot, SlotId, SubstituteRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A stored game plus the timers currently guarding its slots
pub(crate) struct LiveGame {
    pub(crate) game: Game,
    pub(crate) slot_timers: HashMap<SlotId, PendingTimer>,
    pub(crate) timer_seq: u64,
}

impl LiveGame {
    fn next_token(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    fn cancel_slot_timer(&mut self, slot_id: SlotId) {
        if let Some(timer) = self.slot_timers.remove(&slot_id) {
            timer.cancel();
        }
    }

    fn cancel_all_timers(&mut self) {
        for (_, timer) in self.slot_timers.drain() {
            timer.cancel();
        }
    }
}

pub(crate) struct GamesCore {
    pub(crate) games: HashMap<GameId, LiveGame>,
    pub(crate) next_number: u64,
}

/// The main game lifecycle manager
#[derive(Clone)]
pub struct GameManager {
    pub(crate) core: Arc<Mutex<GamesCore>>,
    pub(crate) players: Arc<PlayerDirectory>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) metrics: Arc<MetricsCollector>,
    provider: Arc<dyn GameServerProvider>,
    log_uploader: Arc<dyn LogUploader>,
    pub(crate) config: GameConfig,
}

impl GameManager {
    pub fn new(
        config: GameConfig,
        players: Arc<PlayerDirectory>,
        bus: Arc<EventBus>,
        metrics: Arc<MetricsCollector>,
        provider: Arc<dyn GameServerProvider>,
        log_uploader: Arc<dyn LogUploader>,
    ) -> Self {
        Self {
            core: Arc::new(Mutex::new(GamesCore {
                games: HashMap::new(),
                next_number: 1,
            })),
            players,
            bus,
            metrics,
            provider,
            log_uploader,
            config,
        }
    }

    /// Subscribe this manager to the externally fed join signals
    pub fn wire(&self, bus: &EventBus) {
        let manager = self.clone();
        bus.subscribe(Topic::PlayerJoinedGameServer, move |event| {
            if let Event::PlayerJoinedGameServer(signal) = event {
                if let Err(e) =
                    manager.handle_player_joined_game_server(signal.game_id, &signal.player_id)
                {
                    warn!(game_id = %signal.game_id, error = %e, "ignoring join signal");
                }
            }
            Ok(())
        });

        let manager = self.clone();
        bus.subscribe(Topic::PlayerJoinedTeam, move |event| {
            if let Event::PlayerJoinedTeam(signal) = event {
                if let Err(e) =
                    manager.handle_player_joined_team(signal.game_id, &signal.player_id)
                {
                    warn!(game_id = %signal.game_id, error = %e, "ignoring team signal");
                }
            }
            Ok(())
        });
    }

    /// Create a game from a launching queue.
    ///
    /// Assigns teams honoring the validated friendships, records each
    /// player's active game, starts the per-slot join timers, and hands the
    /// game to the server provider fire-and-forget.
    pub fn create(
        &self,
        slots: &[QueueSlot],
        map: String,
        friendships: &[Friendship],
    ) -> Result<Game> {
        let game_slots = assign_teams(slots, friendships);
        if game_slots.is_empty() {
            return Err(PickupError::InternalError {
                message: "cannot create a game with no occupied slots".to_string(),
            }
            .into());
        }

        let game = {
            let mut core = self.lock_core();
            let number = core.next_number;
            core.next_number += 1;

            let game = Game::new(number, map, game_slots);
            let mut live = LiveGame {
                game: game.clone(),
                slot_timers: HashMap::new(),
                timer_seq: 0,
            };
            for slot_id in live.game.slots.iter().map(|slot| slot.id).collect::<Vec<_>>() {
                self.schedule_slot_timeout(
                    &mut live,
                    game.id,
                    slot_id,
                    self.config.join_gameserver_timeout(),
                );
            }
            core.games.insert(game.id, live);
            game
        };

        for slot in &game.slots {
            if let Err(e) = self.players.set_active_game(&slot.player_id, game.id) {
                warn!(player_id = %slot.player_id, error = %e, "failed to set active game");
            }
        }

        info!(
            game_id = %game.id,
            game_number = game.number,
            map = %game.map,
            players = game.slots.len(),
            "game created"
        );
        self.metrics.games_created_total.inc();

        self.bus.publish(Event::GameCreated(GameCreated {
            game_id: game.id,
            game_number: game.number,
            map: game.map.clone(),
            friendships: friendships.to_vec(),
            timestamp: crate::utils::current_timestamp(),
        }));

        let provider = self.provider.clone();
        let provisioned = game.clone();
        tokio::spawn(async move {
            let game_id = provisioned.id;
            if let Err(e) = provider.launch(provisioned).await {
                // Provisioning failures are the provider's to recover from.
                error!(game_id = %game_id, error = %e, "game server provisioning failed");
            }
        });

        Ok(game)
    }

    /// External signal: the player connected to the allocated server
    pub fn handle_player_joined_game_server(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
    ) -> Result<()> {
        let mut core = self.lock_core();
        let live = live_game_mut(&mut core, game_id)?;
        let slot = live
            .game
            .slot_of_player_mut(player_id)
            .ok_or_else(|| PickupError::PlayerNotFound {
                player_id: player_id.clone(),
            })?;
        let slot_id = slot.id;
        slot.connected = true;
        debug!(game_id = %game_id, player_id = %player_id, "player joined the game server");
        live.cancel_slot_timer(slot_id);
        Ok(())
    }

    /// External signal: a connected player picked their team, completing
    /// the join
    pub fn handle_player_joined_team(&self, game_id: GameId, player_id: &PlayerId) -> Result<()> {
        let mut core = self.lock_core();
        let live = live_game_mut(&mut core, game_id)?;
        let slot = live
            .game
            .slot_of_player_mut(player_id)
            .ok_or_else(|| PickupError::PlayerNotFound {
                player_id: player_id.clone(),
            })?;
        if slot.connected && slot.status == SlotStatus::WaitingToJoin {
            slot.status = SlotStatus::Joined;
            info!(game_id = %game_id, player_id = %player_id, "player fully joined");
        }
        Ok(())
    }

    /// External signal: a fully joined player disconnected; they get a
    /// rejoin window before the slot opens for substitutes
    pub fn handle_player_disconnected(&self, game_id: GameId, player_id: &PlayerId) -> Result<()> {
        let mut core = self.lock_core();
        let live = live_game_mut(&mut core, game_id)?;
        let slot = live
            .game
            .slot_of_player_mut(player_id)
            .ok_or_else(|| PickupError::PlayerNotFound {
                player_id: player_id.clone(),
            })?;
        if slot.status != SlotStatus::Joined || !slot.connected {
            return Ok(());
        }
        let slot_id = slot.id;
        slot.connected = false;
        info!(game_id = %game_id, player_id = %player_id, "player disconnected, rejoin window open");
        self.schedule_slot_timeout(
            live,
            game_id,
            slot_id,
            self.config.rejoin_gameserver_timeout(),
        );
        Ok(())
    }

    /// External signal: the provisioned server is configured and live
    pub fn handle_game_server_initialized(&self, game_id: GameId) -> Result<()> {
        let event = {
            let mut core = self.lock_core();
            let live = live_game_mut(&mut core, game_id)?;
            if live.game.state != GameState::Launching {
                return Ok(());
            }
            live.game.state = GameState::Started;
            info!(game_id = %game_id, "game started");
            Event::GameStateChanged(GameStateChanged {
                game_id,
                state: GameState::Started,
                timestamp: crate::utils::current_timestamp(),
            })
        };
        self.bus.publish(event);
        Ok(())
    }

    /// Admin-forced termination. Idempotent.
    pub fn force_end(&self, game_id: GameId) -> Result<()> {
        self.end_game(game_id, true)
    }

    /// External signal: the game ran to completion on the server
    pub fn handle_game_ended(&self, game_id: GameId) -> Result<()> {
        self.end_game(game_id, false)
    }

    fn end_game(&self, game_id: GameId, forced: bool) -> Result<()> {
        let (events, roster, game_for_upload) = {
            let mut core = self.lock_core();
            let live = core
                .games
                .get_mut(&game_id)
                .ok_or(PickupError::GameNotFound { game_id })?;
            if live.game.state == GameState::Ended {
                return Ok(());
            }

            // Invalidate every pending timer before the transition becomes
            // observable; late firings hit the stale-token guard.
            live.cancel_all_timers();
            live.game.state = GameState::Ended;
            info!(game_id = %game_id, forced, "game ended");

            let roster: Vec<PlayerId> = live
                .game
                .slots
                .iter()
                .map(|slot| slot.player_id.clone())
                .collect();
            let now = crate::utils::current_timestamp();
            let events = vec![
                Event::GameStateChanged(GameStateChanged {
                    game_id,
                    state: GameState::Ended,
                    timestamp: now,
                }),
                Event::GameEnded(GameEnded {
                    game_id,
                    forced,
                    timestamp: now,
                }),
            ];
            (events, roster, live.game.clone())
        };

        for player_id in &roster {
            if let Err(e) = self.players.clear_active_game(player_id) {
                warn!(player_id = %player_id, error = %e, "failed to clear active game");
            }
        }

        for event in events {
            self.bus.publish(event);
        }

        let uploader = self.log_uploader.clone();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            match uploader.upload(&game_for_upload).await {
                Ok(logs_url) => {
                    bus.publish(Event::LogsUploaded(crate::events::messages::LogsUploaded {
                        game_id,
                        logs_url,
                        timestamp: crate::utils::current_timestamp(),
                    }));
                }
                Err(e) => {
                    // A failed upload never blocks or reverses the ended state.
                    warn!(game_id = %game_id, error = %e, "log upload failed");
                }
            }
        });

        Ok(())
    }

    /// Look a game up by id
    pub fn game(&self, game_id: GameId) -> Result<Game> {
        let core = self.lock_core();
        core.games
            .get(&game_id)
            .map(|live| live.game.clone())
            .ok_or_else(|| PickupError::GameNotFound { game_id }.into())
    }

    /// All games, live and ended
    pub fn games(&self) -> Vec<Game> {
        let core = self.lock_core();
        core.games.values().map(|live| live.game.clone()).collect()
    }

    /// Current substitute requests across all live games
    pub fn substitute_requests(&self) -> Vec<SubstituteRequest> {
        let core = self.lock_core();
        let mut requests: Vec<SubstituteRequest> = core
            .games
            .values()
            .filter(|live| live.game.is_live())
            .flat_map(|live| live.game.substitute_requests())
            .collect();
        requests.sort_by_key(|request| request.game_number);
        requests
    }

    pub(crate) fn lock_core(&self) -> MutexGuard<'_, GamesCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn schedule_slot_timeout(
        &self,
        live: &mut LiveGame,
        game_id: GameId,
        slot_id: SlotId,
        timeout: Duration,
    ) {
        let token = live.next_token();
        let manager = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            manager.on_slot_timeout(game_id, slot_id, token);
        });
        if let Some(old) = live.slot_timers.insert(slot_id, PendingTimer { token, task }) {
            old.cancel();
        }
    }

    /// A join or rejoin window elapsed for one slot
    pub(crate) fn on_slot_timeout(&self, game_id: GameId, slot_id: SlotId, token: u64) {
        let event = {
            let mut core = self.lock_core();
            let Some(live) = core.games.get_mut(&game_id) else {
                return;
            };
            // Stale-timer guard: only the currently scheduled timer may act.
            match live.slot_timers.get(&slot_id) {
                Some(timer) if timer.token == token => {}
                _ => return,
            }
            live.slot_timers.remove(&slot_id);

            if !live.game.is_live() {
                return;
            }
            let number = live.game.number;
            let game_id = live.game.id;
            let Some(slot) = live.game.slots.iter_mut().find(|slot| slot.id == slot_id) else {
                return;
            };
            let substitutable = match slot.status {
                SlotStatus::WaitingToJoin => true,
                SlotStatus::Joined => !slot.connected,
                _ => false,
            };
            if !substitutable {
                return;
            }

            slot.status = SlotStatus::WaitingForSubstitute;
            info!(
                game_id = %game_id,
                slot_id,
                player_id = %slot.player_id,
                game_class = %slot.game_class,
                "slot opened for substitutes"
            );
            self.metrics.substitutes_requested_total.inc();
            Event::SubstituteAvailable(SubstituteAvailable {
                request: SubstituteRequest {
                    game_id,
                    game_number: number,
                    game_class: slot.game_class,
                    team: slot.team,
                },
                player_id: slot.player_id.clone(),
                timestamp: crate::utils::current_timestamp(),
            })
        };

        self.bus.publish(event);
    }

    #[cfg(test)]
    pub(crate) fn slot_timer_token(&self, game_id: GameId, slot_id: SlotId) -> Option<u64> {
        self.lock_core()
            .games
            .get(&game_id)
            .and_then(|live| live.slot_timers.get(&slot_id))
            .map(|timer| timer.token)
    }
}

pub(crate) fn live_game_mut(
    core: &mut GamesCore,
    game_id: GameId,
) -> Result<&mut LiveGame> {
    let live = core
        .games
        .get_mut(&game_id)
        .ok_or(PickupError::GameNotFound { game_id })?;
    if !live.game.is_live() {
        return Err(PickupError::GameNotFound { game_id }.into());
    }
    Ok(live)
}
