use thiserror::Error;

use crate::core::types::AgentId;

/// Crate-level error for operations outside the tick loop
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Agent not found: {0}")]
    UnknownAgent(AgentId),

    #[error("Invalid spawn: {0}")]
    InvalidSpawn(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while loading or validating a `SimulationConfig`
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Path query failures. None of these escape a tick; the scheduler
/// recovers from each one locally and counts it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavError {
    #[error("position is not on the navigation surface")]
    InvalidMapPosition,

    #[error("no route between endpoints")]
    Unreachable,

    #[error("search exceeded its iteration budget")]
    IterationBudgetExhausted,

    #[error("path query pool exhausted")]
    QueryPoolExhausted,
}

pub type Result<T> = std::result::Result<T, SimError>;
