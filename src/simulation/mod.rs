//! Tick orchestration and the simulation context

pub mod commands;
pub mod orders;
pub mod parallel;
pub mod stats;
pub mod tick;
pub mod world;

pub use commands::{Command, CommandQueue, DamageEvent, DamageSink, NullDamageSink};
pub use orders::formation_destinations;
pub use stats::{SimCounters, TickStats};
pub use tick::run_tick;
pub use world::{Environment, SimulationWorld};
