//! Spatial partitioning of agents

pub mod grid;
pub mod sparse_hash;

pub use grid::Grid;
pub use sparse_hash::{cell_hash, AgentSnapshot, SpatialIndex};
