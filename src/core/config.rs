//! Simulation configuration with documented constants
//!
//! Every tunable the decision pipeline reads is collected here. The config is
//! owned by the simulation context and passed by reference into each phase.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Hard ceiling on ORCA constraint lines per agent (size of the fixed buffer)
pub const MAX_CONSTRAINT_LINES: usize = 254;

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIME ===
    /// Fixed tick duration in seconds (0.02 = 50 Hz)
    ///
    /// Also scales the emergency separation constraint: overlapping agents
    /// are pushed apart within a single tick.
    pub tick_duration: f32,

    // === SPATIAL SYSTEM ===
    /// Edge length of a spatial hash cell (world units)
    ///
    /// Should be at least the largest avoidance interaction distance so that
    /// a 3x3 neighborhood covers every relevant neighbor.
    pub cell_size: f32,

    // === AVOIDANCE ===
    /// ORCA lookahead in seconds
    ///
    /// Larger = agents start deflecting earlier and more gently.
    /// Smaller = agents hold course longer and swerve late.
    pub time_horizon: f32,

    /// Neighborhood radius in cells scanned for avoidance (1 = 3x3)
    pub avoidance_cell_radius: i32,

    /// Constraint lines kept per agent; nearest neighbors win when capped
    pub max_constraints: usize,

    /// Directions sampled on the max-speed circle when constraints are infeasible
    pub least_violation_samples: u32,

    /// Weight of the distance-to-preferred term in the least-violation score
    pub preferred_deviation_weight: f32,

    // === BUCKETING ===
    /// Number of targeting buckets; each agent searches for enemies once
    /// every `targeting_buckets` ticks
    pub targeting_buckets: u32,

    /// Number of pathing buckets; each agent may recompute its path once
    /// every `pathing_buckets` ticks
    pub pathing_buckets: u32,

    // === PATHFINDING ===
    /// Size of the path query pool (hard bound on agents holding a query)
    pub max_path_queries: usize,

    /// Node expansions allowed per query
    pub path_max_iterations: u32,

    /// Tolerance used when snapping path endpoints onto the nav surface
    pub map_extents: [f32; 3],

    /// Idle ticks after which an agent gives its query slot back
    pub path_slot_idle_release_ticks: u64,

    // === BEHAVIOR THRESHOLDS ===
    /// Distance at which a waypoint (or the final destination) counts as reached
    pub arrival_distance: f32,

    /// Squared distance to destination below which Move becomes Idle
    pub stopping_distance_sq: f32,

    /// Squared distance to destination above which Idle becomes Move
    ///
    /// Kept above `stopping_distance_sq` so agents parked at their
    /// destination do not oscillate between Idle and Move.
    pub resume_distance_sq: f32,

    /// Squared distance a chased target must move before the chaser re-paths
    pub repath_threshold_sq: f32,

    /// Multiplier on attack range squared before Attack falls back to Chase
    pub attack_hysteresis: f32,

    /// Minimum speed squared for an agent to turn toward its velocity
    pub min_facing_speed_sq: f32,

    // === LIFECYCLE ===
    /// Ticks between a death tag and destruction of the agent
    pub despawn_grace_ticks: u64,

    // === PARALLELIZATION ===
    /// Minimum live agent count before phases run on the rayon pool
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,

    /// Contiguous slot range handed to each worker
    pub parallel_chunk_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_duration: 1.0 / 50.0,

            cell_size: 10.0,

            time_horizon: 2.0,
            avoidance_cell_radius: 1,
            max_constraints: MAX_CONSTRAINT_LINES,
            least_violation_samples: 16,
            preferred_deviation_weight: 0.1,

            targeting_buckets: 16,
            pathing_buckets: 8,

            max_path_queries: 1024 * 8,
            path_max_iterations: 256,
            map_extents: [1.0, 2.0, 1.0],
            path_slot_idle_release_ticks: 250,

            arrival_distance: 0.5,
            stopping_distance_sq: 1.0,
            resume_distance_sq: 1.5,
            repath_threshold_sq: 4.0,
            attack_hysteresis: 1.2,
            min_facing_speed_sq: 1e-6,

            despawn_grace_ticks: 1,

            parallel_threshold: 1000,
            parallel_chunk_size: 256,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Tick rate in Hz
    pub fn tick_rate(&self) -> f32 {
        1.0 / self.tick_duration
    }

    /// Convert a duration in seconds to whole ticks (at least one)
    pub fn seconds_to_ticks(&self, seconds: f32) -> u64 {
        ((seconds / self.tick_duration).round() as u64).max(1)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tick_duration", self.tick_duration),
            ("cell_size", self.cell_size),
            ("time_horizon", self.time_horizon),
            ("arrival_distance", self.arrival_distance),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive and finite (got {})",
                    name, value
                )));
            }
        }

        if self.targeting_buckets == 0 || self.pathing_buckets == 0 {
            return Err(ConfigError::Invalid("bucket counts must be at least 1".into()));
        }

        if self.max_path_queries == 0 {
            return Err(ConfigError::Invalid("max_path_queries must be at least 1".into()));
        }

        if self.max_constraints == 0 || self.max_constraints > MAX_CONSTRAINT_LINES {
            return Err(ConfigError::Invalid(format!(
                "max_constraints must be in 1..={} (got {})",
                MAX_CONSTRAINT_LINES, self.max_constraints
            )));
        }

        if self.avoidance_cell_radius < 0 {
            return Err(ConfigError::Invalid("avoidance_cell_radius must be >= 0".into()));
        }

        if self.least_violation_samples == 0 {
            return Err(ConfigError::Invalid(
                "least_violation_samples must be at least 1".into(),
            ));
        }

        if self.attack_hysteresis <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "attack_hysteresis ({}) must be > 1 to prevent state flapping",
                self.attack_hysteresis
            )));
        }

        if self.resume_distance_sq < self.stopping_distance_sq {
            return Err(ConfigError::Invalid(format!(
                "resume_distance_sq ({}) should be >= stopping_distance_sq ({})",
                self.resume_distance_sq, self.stopping_distance_sq
            )));
        }

        if self.parallel_chunk_size == 0 {
            return Err(ConfigError::Invalid("parallel_chunk_size must be at least 1".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_tick_rate_is_50hz() {
        let config = SimulationConfig::default();
        assert!((config.tick_rate() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_seconds_to_ticks_rounds_and_floors_at_one() {
        let config = SimulationConfig::default();
        assert_eq!(config.seconds_to_ticks(0.5), 25);
        assert_eq!(config.seconds_to_ticks(0.0), 1);
        assert_eq!(config.seconds_to_ticks(0.031), 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            cell_size = 12.5
            targeting_buckets = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.cell_size, 12.5);
        assert_eq!(config.targeting_buckets, 4);
        assert_eq!(config.pathing_buckets, SimulationConfig::default().pathing_buckets);
    }

    #[test]
    fn test_rejects_hysteresis_at_or_below_one() {
        let config = SimulationConfig {
            attack_hysteresis: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_buckets() {
        let config = SimulationConfig {
            pathing_buckets: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_constraint_cap_above_buffer() {
        let config = SimulationConfig {
            max_constraints: MAX_CONSTRAINT_LINES + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_resume_below_stop() {
        let config = SimulationConfig {
            resume_distance_sq: 0.5,
            stopping_distance_sq: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = SimulationConfig::from_toml_str("cell_size = \"wide\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
