//! Main entry point for the pickup-room service
//!
//! Wires the queue engine, game manager, replacement coordinator and auto
//! launcher onto one in-process event bus, then idles until shutdown.

use anyhow::Result;
use clap::Parser;
use pickup_room::config::AppConfig;
use pickup_room::games::{GameManager, NoopGameServerProvider, ReplacementCoordinator};
use pickup_room::logs::NoopLogUploader;
use pickup_room::maps::RotationMapPicker;
use pickup_room::metrics::MetricsCollector;
use pickup_room::players::{PlayerDirectory, PolicyAdmissionGuard};
use pickup_room::queue::{AutoLauncher, FriendshipRegistry, QueueEngine};
use pickup_room::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Pickup Room - queue, launch and substitute coordination for pickup games
#[derive(Parser)]
#[command(
    name = "pickup-room",
    version,
    about = "Pickup-game organizer: matchmaking queue, game lifecycle and substitutions"
)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(level) = args.log_level {
        config.service.log_level = level;
        pickup_room::config::validate_config(&config)?;
    }

    init_logging(&config.service.log_level)?;
    info!(
        service = %config.service.name,
        version = pickup_room::VERSION,
        "starting pickup-room"
    );

    let bus = Arc::new(EventBus::new());
    let metrics = Arc::new(MetricsCollector::new()?);
    let players = Arc::new(PlayerDirectory::new());
    let guard = Arc::new(PolicyAdmissionGuard::new(&config.queue));
    let friends = Arc::new(FriendshipRegistry::new());
    let maps = Arc::new(RotationMapPicker::new(
        RotationMapPicker::sixes_pool(),
        config.queue.map_cooldown,
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
        metrics.clone(),
        Arc::new(NoopGameServerProvider),
        Arc::new(NoopLogUploader),
    );
    games.wire(&bus);

    let _replacements = ReplacementCoordinator::new(&games, guard);
    let launcher = AutoLauncher::new(queue, games, friends, maps);
    launcher.wire(&bus);

    info!("pickup-room ready, waiting for players");

    signal::ctrl_c().await?;
    info!("shutdown signal received, exiting");

    Ok(())
}
