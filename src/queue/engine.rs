//! Queue engine: slot occupancy and the ready-up state machine
//!
//! The engine is the single writer for queue state. Every mutation takes the
//! aggregate lock, collects the events it wants to emit, and publishes them
//! only after the lock is released so bus subscribers (the auto launcher in
//! particular) can call back into the engine without deadlocking.
//!
//! Timers are spawned tasks carrying a token; a firing timer revalidates its
//! token and the slot state under the lock before acting, so a cancellation
//! racing a mid-fire timer degrades to a no-op.

use crate::config::QueueConfig;
use crate::error::{PickupError, Result};
use crate::events::messages::{Event, QueueStateChanged};
use crate::events::EventBus;
use crate::metrics::MetricsCollector;
use crate::players::{AdmissionGuard, GuardContext, PlayerDirectory, Verdict};
use crate::timers::PendingTimer;
use crate::types::{PlayerId, QueueSlot, QueueState, SlotId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Serializable view of the whole queue, for transport layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub state: QueueState,
    pub slots: Vec<QueueSlot>,
}

struct QueueCore {
    slots: Vec<QueueSlot>,
    state: QueueState,
    timer_seq: u64,
    slot_timers: HashMap<SlotId, PendingTimer>,
    state_timer: Option<PendingTimer>,
}

impl QueueCore {
    fn slot_index(&self, slot_id: SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == slot_id)
    }

    fn slot_index_of_player(&self, player_id: &PlayerId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.player_id.as_deref() == Some(player_id.as_str()))
    }

    fn is_fully_occupied(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_occupied())
    }

    fn is_everyone_ready(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_occupied() && slot.ready)
    }

    fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }

    fn next_token(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    fn cancel_slot_timer(&mut self, slot_id: SlotId) {
        if let Some(timer) = self.slot_timers.remove(&slot_id) {
            timer.cancel();
        }
    }

    fn cancel_state_timer(&mut self) {
        if let Some(timer) = self.state_timer.take() {
            timer.cancel();
        }
    }

    fn vacate_slot(&mut self, index: usize) {
        let slot_id = self.slots[index].id;
        self.cancel_slot_timer(slot_id);
        self.slots[index].player_id = None;
        self.slots[index].ready = false;
    }
}

/// The matchmaking queue: fixed class-typed slots plus the
/// waiting / ready-up / launching state machine
#[derive(Clone)]
pub struct QueueEngine {
    core: Arc<Mutex<QueueCore>>,
    players: Arc<PlayerDirectory>,
    guard: Arc<dyn AdmissionGuard>,
    bus: Arc<EventBus>,
    metrics: Arc<MetricsCollector>,
    config: QueueConfig,
}

impl QueueEngine {
    pub fn new(
        config: QueueConfig,
        players: Arc<PlayerDirectory>,
        guard: Arc<dyn AdmissionGuard>,
        bus: Arc<EventBus>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let core = QueueCore {
            slots: config.build_slots(),
            state: QueueState::Waiting,
            timer_seq: 0,
            slot_timers: HashMap::new(),
            state_timer: None,
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            players,
            guard,
            bus,
            metrics,
            config,
        }
    }

    /// Take a slot in the queue.
    ///
    /// Fails with `SlotOccupied`, `PlayerAlreadyQueued` or a typed
    /// `PlayerDenied` verdict from the admission guard. On success the slot's
    /// ready-up timer starts; filling the last slot moves the queue into the
    /// ready-up state.
    pub fn join(&self, player_id: &PlayerId, slot_id: SlotId) -> Result<()> {
        let player = self.players.get(player_id)?;

        let events = {
            let mut core = self.lock_core();

            let index = core
                .slot_index(slot_id)
                .ok_or(PickupError::SlotNotFound { slot_id })?;
            if core.slots[index].is_occupied() {
                return Err(PickupError::SlotOccupied { slot_id }.into());
            }
            if core.slot_index_of_player(player_id).is_some() {
                return Err(PickupError::PlayerAlreadyQueued {
                    player_id: player_id.clone(),
                }
                .into());
            }

            let context = GuardContext::JoinQueue {
                game_class: core.slots[index].game_class,
            };
            if let Verdict::Deny(reason) = self.guard.evaluate(&player, &context) {
                return Err(PickupError::PlayerDenied {
                    player_id: player_id.clone(),
                    reason,
                }
                .into());
            }

            core.slots[index].player_id = Some(player_id.clone());
            core.slots[index].ready = false;
            self.schedule_ready_up_timeout(&mut core, slot_id);

            info!(
                player_id = %player_id,
                slot_id,
                game_class = %core.slots[index].game_class,
                "player joined the queue"
            );

            let mut events = Vec::new();
            if core.state == QueueState::Waiting && core.is_fully_occupied() {
                self.enter_ready_up(&mut core, &mut events);
            }
            self.metrics.players_queued_total.inc();
            self.metrics
                .queue_occupied_slots
                .set(core.occupied_count() as i64);
            events
        };

        self.publish_all(events);
        Ok(())
    }

    /// Leave the queue from any state; reverts ready-up to waiting
    pub fn leave(&self, player_id: &PlayerId) -> Result<()> {
        let events = {
            let mut core = self.lock_core();
            let index = core
                .slot_index_of_player(player_id)
                .ok_or(PickupError::PlayerNotQueued {
                    player_id: player_id.clone(),
                })?;
            core.vacate_slot(index);
            info!(player_id = %player_id, "player left the queue");

            let mut events = Vec::new();
            if core.state == QueueState::ReadyUp {
                self.revert_to_waiting(&mut core, &mut events);
            }
            self.metrics
                .queue_occupied_slots
                .set(core.occupied_count() as i64);
            events
        };

        self.publish_all(events);
        Ok(())
    }

    /// Confirm readiness. Readying the last player launches the queue.
    pub fn ready(&self, player_id: &PlayerId) -> Result<()> {
        let events = {
            let mut core = self.lock_core();
            let index = core
                .slot_index_of_player(player_id)
                .ok_or(PickupError::PlayerNotQueued {
                    player_id: player_id.clone(),
                })?;
            let slot_id = core.slots[index].id;
            core.slots[index].ready = true;
            core.cancel_slot_timer(slot_id);
            debug!(player_id = %player_id, slot_id, "player readied up");

            let mut events = Vec::new();
            if core.state != QueueState::Launching && core.is_everyone_ready() {
                self.enter_launching(&mut core, &mut events);
            }
            events
        };

        self.publish_all(events);
        Ok(())
    }

    /// Withdraw readiness. State only reverts through timers, never from
    /// this call alone.
    pub fn unready(&self, player_id: &PlayerId) -> Result<()> {
        let mut core = self.lock_core();
        let index = core
            .slot_index_of_player(player_id)
            .ok_or(PickupError::PlayerNotQueued {
                player_id: player_id.clone(),
            })?;
        core.slots[index].ready = false;
        debug!(player_id = %player_id, "player withdrew readiness");
        Ok(())
    }

    /// Empty the queue and return to waiting. Idempotent; called by the auto
    /// launcher after a game has been created.
    pub fn reset(&self) {
        let events = {
            let mut core = self.lock_core();
            let untouched = core.state == QueueState::Waiting
                && core.slots.iter().all(|slot| !slot.is_occupied());
            if untouched {
                return;
            }

            core.cancel_state_timer();
            for index in 0..core.slots.len() {
                core.vacate_slot(index);
            }
            info!("queue reset");

            let mut events = Vec::new();
            if core.state != QueueState::Waiting {
                core.state = QueueState::Waiting;
                events.push(state_changed(QueueState::Waiting));
            }
            self.metrics.queue_occupied_slots.set(0);
            events
        };

        self.publish_all(events);
    }

    /// Current queue state
    pub fn state(&self) -> QueueState {
        self.lock_core().state
    }

    /// Full serializable view of the queue
    pub fn snapshot(&self) -> QueueSnapshot {
        let core = self.lock_core();
        QueueSnapshot {
            state: core.state,
            slots: core.slots.clone(),
        }
    }

    /// Clone of all slots, occupied or not
    pub fn slots(&self) -> Vec<QueueSlot> {
        self.lock_core().slots.clone()
    }

    fn lock_core(&self) -> MutexGuard<'_, QueueCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            self.bus.publish(event);
        }
    }

    fn enter_ready_up(&self, core: &mut QueueCore, events: &mut Vec<Event>) {
        core.state = QueueState::ReadyUp;
        self.schedule_ready_state_timeout(core);
        info!("queue is full, entering ready-up");
        events.push(state_changed(QueueState::ReadyUp));
    }

    fn enter_launching(&self, core: &mut QueueCore, events: &mut Vec<Event>) {
        core.state = QueueState::Launching;
        core.cancel_state_timer();
        let slot_ids: Vec<SlotId> = core.slot_timers.keys().copied().collect();
        for slot_id in slot_ids {
            core.cancel_slot_timer(slot_id);
        }
        info!("all players ready, launching");
        events.push(state_changed(QueueState::Launching));
    }

    fn revert_to_waiting(&self, core: &mut QueueCore, events: &mut Vec<Event>) {
        core.state = QueueState::Waiting;
        core.cancel_state_timer();
        events.push(state_changed(QueueState::Waiting));
    }

    fn schedule_ready_up_timeout(&self, core: &mut QueueCore, slot_id: SlotId) {
        let token = core.next_token();
        let engine = self.clone();
        let timeout = self.config.ready_up_timeout();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.on_ready_up_timeout(slot_id, token);
        });
        if let Some(old) = core.slot_timers.insert(slot_id, PendingTimer { token, task }) {
            old.cancel();
        }
    }

    fn schedule_ready_state_timeout(&self, core: &mut QueueCore) {
        let token = core.next_token();
        let engine = self.clone();
        let timeout = self.config.ready_state_timeout();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.on_ready_state_timeout(token);
        });
        core.cancel_state_timer();
        core.state_timer = Some(PendingTimer { token, task });
    }

    /// A slot's ready-up window elapsed without the occupant readying up
    fn on_ready_up_timeout(&self, slot_id: SlotId, token: u64) {
        let events = {
            let mut core = self.lock_core();
            // Stale-timer guard: only the currently scheduled timer may act.
            match core.slot_timers.get(&slot_id) {
                Some(timer) if timer.token == token => {}
                _ => return,
            }
            core.slot_timers.remove(&slot_id);

            let Some(index) = core.slot_index(slot_id) else {
                return;
            };
            if !core.slots[index].is_occupied() || core.slots[index].ready {
                return;
            }

            info!(
                slot_id,
                player_id = ?core.slots[index].player_id,
                "ready-up timeout, vacating slot"
            );
            core.vacate_slot(index);

            let mut events = Vec::new();
            if core.state == QueueState::ReadyUp {
                // The queue is no longer fully occupied.
                self.revert_to_waiting(&mut core, &mut events);
            }
            self.metrics
                .queue_occupied_slots
                .set(core.occupied_count() as i64);
            events
        };

        self.publish_all(events);
    }

    /// The whole ready-up window elapsed; everyone unready is kicked out
    fn on_ready_state_timeout(&self, token: u64) {
        let events = {
            let mut core = self.lock_core();
            match &core.state_timer {
                Some(timer) if timer.token == token => {}
                _ => return,
            }
            core.state_timer = None;
            if core.state != QueueState::ReadyUp {
                return;
            }

            info!("ready-up state timed out, vacating unready slots");
            let unready: Vec<usize> = core
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_occupied() && !slot.ready)
                .map(|(index, _)| index)
                .collect();
            for index in unready {
                core.vacate_slot(index);
            }

            let mut events = Vec::new();
            core.state = QueueState::Waiting;
            events.push(state_changed(QueueState::Waiting));
            self.metrics
                .queue_occupied_slots
                .set(core.occupied_count() as i64);
            events
        };

        self.publish_all(events);
    }

    #[cfg(test)]
    fn slot_timer_token(&self, slot_id: SlotId) -> Option<u64> {
        self.lock_core()
            .slot_timers
            .get(&slot_id)
            .map(|timer| timer.token)
    }

    #[cfg(test)]
    fn state_timer_token(&self) -> Option<u64> {
        self.lock_core().state_timer.as_ref().map(|timer| timer.token)
    }
}

fn state_changed(state: QueueState) -> Event {
    Event::QueueStateChanged(QueueStateChanged {
        state,
        timestamp: crate::utils::current_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueueConfig, SlotLayoutEntry};
    use crate::error::DenyReason;
    use crate::events::Topic;
    use crate::players::PolicyAdmissionGuard;
    use crate::types::{GameClass, Player};
    use std::sync::Mutex as StdMutex;

    fn small_layout() -> Vec<SlotLayoutEntry> {
        vec![
            SlotLayoutEntry {
                game_class: GameClass::Scout,
                count: 1,
                can_make_friends_with: None,
            },
            SlotLayoutEntry {
                game_class: GameClass::Soldier,
                count: 1,
                can_make_friends_with: None,
            },
        ]
    }

    fn test_config(layout: Vec<SlotLayoutEntry>) -> QueueConfig {
        QueueConfig {
            slot_layout: layout,
            ..QueueConfig::default()
        }
    }

    fn build_engine(config: QueueConfig) -> (QueueEngine, Arc<PlayerDirectory>, Arc<EventBus>) {
        let players = Arc::new(PlayerDirectory::new());
        let guard = Arc::new(PolicyAdmissionGuard::new(&config));
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(MetricsCollector::default());
        let engine = QueueEngine::new(config, players.clone(), guard, bus.clone(), metrics);
        (engine, players, bus)
    }

    fn add_player(players: &PlayerDirectory, id: &str) {
        let mut player = Player::new(id, id);
        player.has_accepted_rules = true;
        players.upsert(player);
    }

    fn record_states(bus: &EventBus) -> Arc<StdMutex<Vec<QueueState>>> {
        let states = Arc::new(StdMutex::new(Vec::new()));
        let recorder = states.clone();
        bus.subscribe(Topic::QueueStateChanged, move |event| {
            if let Event::QueueStateChanged(changed) = event {
                recorder.lock().unwrap().push(changed.state);
            }
            Ok(())
        });
        states
    }

    #[tokio::test]
    async fn test_join_occupies_slot() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");

        engine.join(&"p1".to_string(), 0).unwrap();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, QueueState::Waiting);
        assert_eq!(snapshot.slots[0].player_id.as_deref(), Some("p1"));
        assert!(!snapshot.slots[0].ready);
    }

    #[tokio::test]
    async fn test_join_occupied_slot_fails() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        let err = engine.join(&"p2".to_string(), 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PickupError>(),
            Some(PickupError::SlotOccupied { slot_id: 0 })
        ));
    }

    #[tokio::test]
    async fn test_player_cannot_queue_twice() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");

        engine.join(&"p1".to_string(), 0).unwrap();
        let err = engine.join(&"p1".to_string(), 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PickupError>(),
            Some(PickupError::PlayerAlreadyQueued { .. })
        ));
    }

    #[tokio::test]
    async fn test_join_unknown_slot_fails() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");

        let err = engine.join(&"p1".to_string(), 99).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PickupError>(),
            Some(PickupError::SlotNotFound { slot_id: 99 })
        ));
    }

    #[tokio::test]
    async fn test_guard_denial_is_typed() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        // Never accepted the rules.
        players.upsert(Player::new("p1", "p1"));

        let err = engine.join(&"p1".to_string(), 0).unwrap_err();
        match err.downcast_ref::<PickupError>() {
            Some(PickupError::PlayerDenied { reason, .. }) => {
                assert_eq!(*reason, DenyReason::PlayerHasNotAcceptedRules);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_engine_surfaces_any_guard_verdict() {
        // The engine passes guard verdicts through untouched, whatever
        // policy produced them.
        let mut guard = crate::players::guard::MockAdmissionGuard::new();
        guard
            .expect_evaluate()
            .returning(|_, _| Verdict::Deny(DenyReason::PlayerIsBanned));

        let players = Arc::new(PlayerDirectory::new());
        add_player(&players, "p1");
        let engine = QueueEngine::new(
            test_config(small_layout()),
            players,
            Arc::new(guard),
            Arc::new(EventBus::new()),
            Arc::new(MetricsCollector::default()),
        );

        let err = engine.join(&"p1".to_string(), 0).unwrap_err();
        match err.downcast_ref::<PickupError>() {
            Some(PickupError::PlayerDenied { reason, .. }) => {
                assert_eq!(*reason, DenyReason::PlayerIsBanned);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(engine.snapshot().slots[0].player_id.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_enters_ready_up() {
        let (engine, players, bus) = build_engine(test_config(small_layout()));
        let states = record_states(&bus);
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        assert_eq!(engine.state(), QueueState::Waiting);

        engine.join(&"p2".to_string(), 1).unwrap();
        assert_eq!(engine.state(), QueueState::ReadyUp);
        assert_eq!(*states.lock().unwrap(), vec![QueueState::ReadyUp]);
        assert!(engine.state_timer_token().is_some());
    }

    #[tokio::test]
    async fn test_everyone_ready_launches_exactly_once() {
        let (engine, players, bus) = build_engine(test_config(small_layout()));
        let states = record_states(&bus);
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.join(&"p2".to_string(), 1).unwrap();
        engine.ready(&"p1".to_string()).unwrap();
        assert_eq!(engine.state(), QueueState::ReadyUp);
        engine.ready(&"p2".to_string()).unwrap();

        assert_eq!(engine.state(), QueueState::Launching);
        assert_eq!(
            *states.lock().unwrap(),
            vec![QueueState::ReadyUp, QueueState::Launching]
        );
        // Launching cancelled the state timer and all slot timers.
        assert!(engine.state_timer_token().is_none());
        assert!(engine.slot_timer_token(0).is_none());
        assert!(engine.slot_timer_token(1).is_none());
    }

    #[tokio::test]
    async fn test_leave_during_ready_up_reverts_to_waiting() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.join(&"p2".to_string(), 1).unwrap();
        assert_eq!(engine.state(), QueueState::ReadyUp);

        engine.leave(&"p2".to_string()).unwrap();
        assert_eq!(engine.state(), QueueState::Waiting);
        assert!(engine.snapshot().slots[1].player_id.is_none());
    }

    #[tokio::test]
    async fn test_leave_when_not_queued_fails() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");

        let err = engine.leave(&"p1".to_string()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PickupError>(),
            Some(PickupError::PlayerNotQueued { .. })
        ));
    }

    #[tokio::test]
    async fn test_ready_state_timeout_vacates_unready() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.join(&"p2".to_string(), 1).unwrap();
        engine.ready(&"p1".to_string()).unwrap();

        let token = engine.state_timer_token().unwrap();
        engine.on_ready_state_timeout(token);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, QueueState::Waiting);
        // Ready player stays, unready player is vacated.
        assert_eq!(snapshot.slots[0].player_id.as_deref(), Some("p1"));
        assert!(snapshot.slots[1].player_id.is_none());
    }

    #[tokio::test]
    async fn test_stale_ready_state_timer_is_noop() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.join(&"p2".to_string(), 1).unwrap();
        let token = engine.state_timer_token().unwrap();

        // The queue launches before the timer fires.
        engine.ready(&"p1".to_string()).unwrap();
        engine.ready(&"p2".to_string()).unwrap();
        assert_eq!(engine.state(), QueueState::Launching);

        engine.on_ready_state_timeout(token);
        assert_eq!(engine.state(), QueueState::Launching);
        assert_eq!(engine.snapshot().slots[0].player_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_slot_timeout_vacates_and_reverts_ready_up() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.join(&"p2".to_string(), 1).unwrap();
        assert_eq!(engine.state(), QueueState::ReadyUp);

        let token = engine.slot_timer_token(1).unwrap();
        engine.on_ready_up_timeout(1, token);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, QueueState::Waiting);
        assert!(snapshot.slots[1].player_id.is_none());
        assert_eq!(snapshot.slots[0].player_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_stale_slot_timer_after_ready_is_noop() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");

        engine.join(&"p1".to_string(), 0).unwrap();
        let token = engine.slot_timer_token(0).unwrap();
        engine.ready(&"p1".to_string()).unwrap();

        engine.on_ready_up_timeout(0, token);
        assert_eq!(engine.snapshot().slots[0].player_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_slot_timer_really_fires() {
        let config = QueueConfig {
            ready_up_timeout_ms: 30,
            ..test_config(small_layout())
        };
        let (engine, players, _bus) = build_engine(config);
        add_player(&players, "p1");

        engine.join(&"p1".to_string(), 0).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(120)).await;

        assert!(engine.snapshot().slots[0].player_id.is_none());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let (engine, players, bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        let states = record_states(&bus);

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.reset();
        assert_eq!(engine.state(), QueueState::Waiting);
        assert!(engine.snapshot().slots.iter().all(|s| !s.is_occupied()));

        // Second reset on an already-empty queue publishes nothing.
        let published_before = states.lock().unwrap().len();
        engine.reset();
        assert_eq!(states.lock().unwrap().len(), published_before);
    }

    #[tokio::test]
    async fn test_unready_does_not_revert_state() {
        let (engine, players, _bus) = build_engine(test_config(small_layout()));
        add_player(&players, "p1");
        add_player(&players, "p2");

        engine.join(&"p1".to_string(), 0).unwrap();
        engine.join(&"p2".to_string(), 1).unwrap();
        engine.ready(&"p1".to_string()).unwrap();
        engine.unready(&"p1".to_string()).unwrap();

        // Only timers revert the ready-up state.
        assert_eq!(engine.state(), QueueState::ReadyUp);
        assert!(!engine.snapshot().slots[0].ready);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        // Pins the tie-break between the per-slot and whole-state timers:
        // once the state timeout has vacated a slot, that slot's own timer
        // firing afterwards (with its stale token) must change nothing.
        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]
            #[test]
            fn state_timeout_then_stale_slot_timeouts(ready_mask in proptest::collection::vec(any::<bool>(), 4)) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let layout = vec![SlotLayoutEntry {
                        game_class: GameClass::Scout,
                        count: 4,
                        can_make_friends_with: None,
                    }];
                    let (engine, players, _bus) = build_engine(test_config(layout));

                    let everyone_ready = ready_mask.iter().all(|ready| *ready);
                    let mut slot_tokens = Vec::new();
                    for i in 0..4u64 {
                        let id = format!("p{}", i);
                        add_player(&players, &id);
                        engine.join(&id, i).unwrap();
                        slot_tokens.push((i, engine.slot_timer_token(i)));
                    }
                    let state_token = engine.state_timer_token().unwrap();
                    for (i, ready) in ready_mask.iter().enumerate() {
                        if *ready {
                            engine.ready(&format!("p{}", i)).unwrap();
                        }
                    }

                    engine.on_ready_state_timeout(state_token);
                    let after_state = engine.snapshot();

                    // Stale per-slot timers fire afterwards; nothing changes.
                    for (slot_id, token) in slot_tokens {
                        if let Some(token) = token {
                            engine.on_ready_up_timeout(slot_id, token);
                        }
                    }
                    let after_slots = engine.snapshot();

                    if everyone_ready {
                        // The queue launched before the state timeout;
                        // the stale state timer was a no-op.
                        prop_assert_eq!(after_state.state, QueueState::Launching);
                    } else {
                        prop_assert_eq!(after_state.state, QueueState::Waiting);
                        for (slot, ready) in after_state.slots.iter().zip(ready_mask.iter()) {
                            prop_assert_eq!(slot.is_occupied(), *ready);
                        }
                    }
                    prop_assert_eq!(
                        serde_json::to_string(&after_state).unwrap(),
                        serde_json::to_string(&after_slots).unwrap()
                    );
                    Ok(())
                })?;
            }
        }
    }
}
