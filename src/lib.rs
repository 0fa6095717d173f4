//! Swarm Tactics - Agent Movement and Combat Decision Pipeline

pub mod agent;
pub mod avoidance;
pub mod behavior;
pub mod core;
pub mod movement;
pub mod nav;
pub mod simulation;
pub mod spatial;
pub mod targeting;
