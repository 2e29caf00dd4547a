//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! pickup-room service, including file and environment variable loading
//! and validation.

use crate::config::game::GameConfig;
use crate::config::queue::QueueConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub queue: QueueConfig,
    pub games: GameConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pickup-room".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        if let Ok(timeout) = env::var("READY_UP_TIMEOUT_MS") {
            config.queue.ready_up_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid READY_UP_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(timeout) = env::var("READY_STATE_TIMEOUT_MS") {
            config.queue.ready_state_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid READY_STATE_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(cooldown) = env::var("MAP_COOLDOWN") {
            config.queue.map_cooldown = cooldown
                .parse()
                .map_err(|_| anyhow!("Invalid MAP_COOLDOWN value: {}", cooldown))?;
        }
        if let Ok(deny) = env::var("DENY_PLAYERS_WITH_NO_SKILL_ASSIGNED") {
            config.queue.deny_players_with_no_skill_assigned = deny.parse().map_err(|_| {
                anyhow!("Invalid DENY_PLAYERS_WITH_NO_SKILL_ASSIGNED value: {}", deny)
            })?;
        }

        if let Ok(timeout) = env::var("JOIN_GAMESERVER_TIMEOUT_MS") {
            config.games.join_gameserver_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid JOIN_GAMESERVER_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(timeout) = env::var("REJOIN_GAMESERVER_TIMEOUT_MS") {
            config.games.rejoin_gameserver_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid REJOIN_GAMESERVER_TIMEOUT_MS value: {}", timeout))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.queue.ready_up_timeout_ms == 0 {
        return Err(anyhow!("Ready-up timeout must be greater than 0"));
    }
    if config.queue.ready_state_timeout_ms == 0 {
        return Err(anyhow!("Ready-state timeout must be greater than 0"));
    }
    if config.queue.slot_layout.is_empty() {
        return Err(anyhow!("Slot layout cannot be empty"));
    }
    if config.queue.slot_layout.iter().any(|entry| entry.count == 0) {
        return Err(anyhow!("Slot layout entries must have a count greater than 0"));
    }

    if config.games.join_gameserver_timeout_ms == 0 {
        return Err(anyhow!("Join-gameserver timeout must be greater than 0"));
    }
    if config.games.rejoin_gameserver_timeout_ms == 0 {
        return Err(anyhow!("Rejoin-gameserver timeout must be greater than 0"));
    }

    Ok(())
}
