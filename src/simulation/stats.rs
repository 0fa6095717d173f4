//! Tick counters
//!
//! Recoverable failures inside a tick never surface as errors; they are
//! counted here instead.

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub tick: Tick,
    pub live_agents: usize,

    pub targeting_processed: usize,
    pub stale_targets: usize,

    pub pathing_processed: usize,
    pub paths_computed: usize,
    pub path_fallbacks: usize,
    pub invalid_map_positions: usize,
    pub pool_exhausted: usize,
    pub slots_released: usize,

    pub infeasible_avoidance: usize,
    pub constraints_dropped: usize,

    pub attacks: usize,
    pub damage_applied: usize,
    pub deaths: usize,
    pub despawned: usize,
    pub rejected_orders: usize,
}

impl TickStats {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }
}

/// Totals since the simulation was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimCounters {
    pub ticks: u64,
    pub stale_targets: u64,
    pub paths_computed: u64,
    pub path_fallbacks: u64,
    pub invalid_map_positions: u64,
    pub pool_exhausted: u64,
    pub infeasible_avoidance: u64,
    pub constraints_dropped: u64,
    pub attacks: u64,
    pub damage_applied: u64,
    pub deaths: u64,
    pub despawned: u64,
    pub rejected_orders: u64,
}

impl SimCounters {
    pub fn absorb(&mut self, stats: &TickStats) {
        self.ticks += 1;
        self.stale_targets += stats.stale_targets as u64;
        self.paths_computed += stats.paths_computed as u64;
        self.path_fallbacks += stats.path_fallbacks as u64;
        self.invalid_map_positions += stats.invalid_map_positions as u64;
        self.pool_exhausted += stats.pool_exhausted as u64;
        self.infeasible_avoidance += stats.infeasible_avoidance as u64;
        self.constraints_dropped += stats.constraints_dropped as u64;
        self.attacks += stats.attacks as u64;
        self.damage_applied += stats.damage_applied as u64;
        self.deaths += stats.deaths as u64;
        self.despawned += stats.despawned as u64;
        self.rejected_orders += stats.rejected_orders as u64;
    }
}
