//! Prometheus metrics for queue and game activity
//!
//! The collector owns its registry; an exporter surface is intentionally
//! not part of this crate.

use crate::error::Result;
use prometheus::{IntCounter, IntGauge, Registry};
use tracing::warn;

/// Collector for the service's counters and gauges
pub struct MetricsCollector {
    registry: Registry,
    pub players_queued_total: IntCounter,
    pub games_created_total: IntCounter,
    pub substitutes_requested_total: IntCounter,
    pub players_replaced_total: IntCounter,
    pub cooldowns_issued_total: IntCounter,
    pub queue_occupied_slots: IntGauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let players_queued_total = IntCounter::new(
            "pickup_players_queued_total",
            "Total number of successful queue joins",
        )?;
        let games_created_total = IntCounter::new(
            "pickup_games_created_total",
            "Total number of games created from a launching queue",
        )?;
        let substitutes_requested_total = IntCounter::new(
            "pickup_substitutes_requested_total",
            "Total number of slots marked as waiting for a substitute",
        )?;
        let players_replaced_total = IntCounter::new(
            "pickup_players_replaced_total",
            "Total number of executed substitutions",
        )?;
        let cooldowns_issued_total = IntCounter::new(
            "pickup_cooldowns_issued_total",
            "Total number of cooldown bans issued",
        )?;
        let queue_occupied_slots = IntGauge::new(
            "pickup_queue_occupied_slots",
            "Number of currently occupied queue slots",
        )?;

        registry.register(Box::new(players_queued_total.clone()))?;
        registry.register(Box::new(games_created_total.clone()))?;
        registry.register(Box::new(substitutes_requested_total.clone()))?;
        registry.register(Box::new(players_replaced_total.clone()))?;
        registry.register(Box::new(cooldowns_issued_total.clone()))?;
        registry.register(Box::new(queue_occupied_slots.clone()))?;

        Ok(Self {
            registry,
            players_queued_total,
            games_created_total,
            substitutes_requested_total,
            players_replaced_total,
            cooldowns_issued_total,
            queue_occupied_slots,
        })
    }

    /// Gather current metric families (for logging or scraping adapters)
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            warn!(error = %e, "failed to build metrics registry, retrying with a fresh one");
            Self::new().expect("metrics registry construction cannot fail twice")
        })
    }
}
