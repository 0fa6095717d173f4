//! Collaborator interfaces for terrain and navigation-surface queries
//!
//! Both traits are queried concurrently from the parallel phases and must be
//! safe to share across threads. Implementations are read-only during a tick.

use glam::Vec3;

use crate::core::error::NavError;

/// Identifier of one polygon (or cell) of the navigation surface
pub type PolyId = u32;

/// A point snapped onto the navigation surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavLocation {
    pub poly: PolyId,
    pub position: Vec3,
}

/// Ground height lookup used to ground orders and moving agents
pub trait TerrainQuery: Send + Sync {
    /// Walkable ground height under `position`, or `None` where there is no ground
    fn ground_height(&self, position: Vec3) -> Option<f32>;
}

/// Navigation surface able to answer path queries
pub trait NavMeshQuery: Send + Sync {
    /// Snap `position` onto the surface within `extents` (half sizes, y is vertical)
    fn map_location(&self, position: Vec3, extents: Vec3) -> Option<NavLocation>;

    /// Search for a polygon corridor from `from` to `to`, writing it into `corridor`.
    ///
    /// The search expands at most `max_iterations` nodes.
    fn find_corridor(
        &self,
        from: NavLocation,
        to: NavLocation,
        max_iterations: u32,
        corridor: &mut Vec<PolyId>,
    ) -> Result<(), NavError>;

    /// Reduce a corridor to a taut polyline from `from` to `to`, both included
    fn straight_path(
        &self,
        from: Vec3,
        to: Vec3,
        corridor: &[PolyId],
        out: &mut Vec<Vec3>,
    ) -> Result<(), NavError>;
}

/// Terrain that is flat ground everywhere
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatTerrain {
    pub height: f32,
}

impl FlatTerrain {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl TerrainQuery for FlatTerrain {
    fn ground_height(&self, _position: Vec3) -> Option<f32> {
        Some(self.height)
    }
}
