//! Sparse hash grid of start-of-tick agent snapshots
//!
//! Rebuilt from scratch every tick and read-only afterwards, so every phase
//! that queries it sees the same world state regardless of what the phase
//! writes into its own agent.

use ahash::AHashMap;
use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::agent::store::AgentStore;
use crate::core::types::{dist_sq_xz, AgentId, TeamId};

const NO_SNAPSHOT: u32 = u32::MAX;

/// Largest neighborhood radius any range query may span
pub const MAX_QUERY_RADIUS_CELLS: i32 = 64;

/// Lightweight copy of the fields other agents may read during a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Vec3,
    pub velocity: Vec2,
    pub radius: f32,
    pub team: TeamId,
    pub hit_points: i32,
    cell: (i32, i32),
}

/// Combine integer cell coordinates with large odd primes to decorrelate axes
#[inline]
pub fn cell_hash(cx: i32, cz: i32) -> i32 {
    cx.wrapping_mul(73_856_093) ^ cz.wrapping_mul(19_349_663)
}

/// Multi-map from cell hash to the snapshots inside that cell
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    snapshots: Vec<AgentSnapshot>,
    cells: AHashMap<i32, Vec<u32>>,
    by_slot: Vec<u32>,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            snapshots: Vec::new(),
            cells: AHashMap::new(),
            by_slot: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cell_coord(&self, pos: Vec3) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    /// Cell radius whose neighborhood covers every point within `range`,
    /// capped at [`MAX_QUERY_RADIUS_CELLS`]
    pub fn cells_for_range(&self, range: f32) -> i32 {
        let cells = (range / self.cell_size).ceil();
        if cells.is_nan() {
            return 0;
        }
        cells.clamp(0.0, MAX_QUERY_RADIUS_CELLS as f32) as i32
    }

    /// Rebuild from every living agent in slot order. O(N).
    pub fn rebuild(&mut self, agents: &AgentStore) {
        // Cells left empty by last tick's rebuild are dropped; the rest keep
        // their allocations.
        self.cells.retain(|_, members| !members.is_empty());
        for members in self.cells.values_mut() {
            members.clear();
        }
        self.snapshots.clear();
        self.snapshots.reserve(agents.len());
        self.by_slot.clear();
        self.by_slot.resize(agents.slots().len(), NO_SNAPSHOT);

        for agent in agents.iter().filter(|a| a.is_alive()) {
            let cell = self.cell_coord(agent.position);
            let idx = self.snapshots.len() as u32;
            self.snapshots.push(AgentSnapshot {
                id: agent.id,
                position: agent.position,
                velocity: agent.motion.velocity,
                radius: agent.motion.radius,
                team: agent.team,
                hit_points: agent.hit_points,
                cell,
            });
            self.cells.entry(cell_hash(cell.0, cell.1)).or_default().push(idx);
            self.by_slot[agent.id.slot()] = idx;
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[AgentSnapshot] {
        &self.snapshots
    }

    /// Snapshot of a living agent; stale or dead ids resolve to `None`
    pub fn get(&self, id: AgentId) -> Option<&AgentSnapshot> {
        let idx = *self.by_slot.get(id.slot())?;
        if idx == NO_SNAPSHOT {
            return None;
        }
        self.snapshots.get(idx as usize).filter(|s| s.id == id)
    }

    /// Snapshots whose cell is exactly `(cx, cz)`, in insertion order.
    ///
    /// Hash collisions between distinct cells are filtered out here.
    pub fn query_cell(&self, cx: i32, cz: i32) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        self.cells
            .get(&cell_hash(cx, cz))
            .into_iter()
            .flatten()
            .map(move |&idx| &self.snapshots[idx as usize])
            .filter(move |s| s.cell == (cx, cz))
    }

    /// Snapshots in the (2r+1)x(2r+1) cell neighborhood of `pos`.
    ///
    /// Enumeration order is fixed: dx ascending, then dz ascending, then
    /// insertion order within a cell.
    pub fn query_neighborhood(
        &self,
        pos: Vec3,
        radius_cells: i32,
    ) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        let (cx, cz) = self.cell_coord(pos);
        (-radius_cells..=radius_cells).flat_map(move |dx| {
            (-radius_cells..=radius_cells).flat_map(move |dz| self.query_cell(cx + dx, cz + dz))
        })
    }

    /// Snapshots within `radius` (ground distance) of `pos`
    pub fn query_radius(&self, pos: Vec3, radius: f32) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        let radius_sq = radius * radius;
        self.query_neighborhood(pos, self.cells_for_range(radius))
            .filter(move |s| dist_sq_xz(s.position, pos) <= radius_sq)
    }
}
