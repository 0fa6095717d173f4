//! Navigation: query interfaces, the reference grid surface, and path scheduling

pub mod grid;
pub mod pool;
pub mod query;
pub mod scheduler;

pub use grid::{NavCell, NavGrid};
pub use pool::{QueryPool, QuerySlot};
pub use query::{FlatTerrain, NavLocation, NavMeshQuery, PolyId, TerrainQuery};
pub use scheduler::{PathOutcome, PathPhaseStats, PathScheduler};
