//! Shared fixtures for integration tests

use pickup_room::config::{AppConfig, GameConfig, QueueConfig};
use pickup_room::events::{Event, EventBus, Topic};
use pickup_room::games::{GameManager, NoopGameServerProvider, ReplacementCoordinator};
use pickup_room::logs::NoopLogUploader;
use pickup_room::maps::{MapPicker, RotationMapPicker};
use pickup_room::metrics::MetricsCollector;
use pickup_room::players::{PlayerDirectory, PolicyAdmissionGuard};
use pickup_room::queue::{AutoLauncher, FriendshipRegistry, QueueEngine};
use pickup_room::types::Player;
use std::sync::{Arc, Mutex};

const ALL_TOPICS: [Topic; 9] = [
    Topic::QueueStateChanged,
    Topic::GameCreated,
    Topic::GameStateChanged,
    Topic::GameEnded,
    Topic::PlayerJoinedGameServer,
    Topic::PlayerJoinedTeam,
    Topic::SubstituteAvailable,
    Topic::PlayerReplaced,
    Topic::LogsUploaded,
];

/// Records every event published on the bus, across all topics
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventRecorder {
    pub fn attach(bus: &EventBus) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        for topic in ALL_TOPICS {
            let sink = events.clone();
            bus.subscribe(topic, move |event| {
                sink.lock().unwrap().push(event.clone());
                Ok(())
            });
        }
        Self { events }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, topic: Topic) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.topic() == topic)
            .count()
    }
}

/// A fully wired in-process system: queue, games, substitutions, launcher
pub struct TestSystem {
    pub queue: QueueEngine,
    pub games: GameManager,
    pub replacements: ReplacementCoordinator,
    pub friends: Arc<FriendshipRegistry>,
    pub players: Arc<PlayerDirectory>,
    pub bus: Arc<EventBus>,
    pub recorder: EventRecorder,
}

impl TestSystem {
    /// Register an eligible player, ready to queue
    pub fn add_player(&self, id: &str) {
        let mut player = Player::new(id, id);
        player.has_accepted_rules = true;
        self.players.upsert(player);
    }
}

pub fn default_test_config() -> AppConfig {
    let mut config = AppConfig::default();
    // Short join window so timeout tests run in real time.
    config.games = GameConfig {
        join_gameserver_timeout_ms: 100,
        rejoin_gameserver_timeout_ms: 100,
        ..GameConfig::default()
    };
    config
}

pub fn create_test_system(config: AppConfig) -> TestSystem {
    let bus = Arc::new(EventBus::new());
    let recorder = EventRecorder::attach(&bus);
    let metrics = Arc::new(MetricsCollector::default());
    let players = Arc::new(PlayerDirectory::new());
    let guard = Arc::new(PolicyAdmissionGuard::new(&config.queue));
    let friends = Arc::new(FriendshipRegistry::new());
    let maps: Arc<dyn MapPicker> = Arc::new(RotationMapPicker::new(
        vec!["cp_badlands".to_string()],
        0,
    ));

    let queue = QueueEngine::new(
        config.queue.clone(),
        players.clone(),
        guard.clone(),
        bus.clone(),
        metrics.clone(),
    );
    let games = GameManager::new(
        config.games.clone(),
        players.clone(),
        bus.clone(),
        metrics,
        Arc::new(NoopGameServerProvider),
        Arc::new(NoopLogUploader),
    );
    games.wire(&bus);
    let replacements = ReplacementCoordinator::new(&games, guard);
    let launcher = AutoLauncher::new(
        queue.clone(),
        games.clone(),
        friends.clone(),
        maps,
    );
    launcher.wire(&bus);

    TestSystem {
        queue,
        games,
        replacements,
        friends,
        players,
        bus,
        recorder,
    }
}

/// Convenience: the default 6v6 system with a short join window
pub fn create_sixes_system() -> TestSystem {
    let system = create_test_system(default_test_config());
    debug_assert_eq!(QueueConfig::default().slot_count(), 12);
    system
}
