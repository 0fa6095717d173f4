//! Grid-backed navigation surface
//!
//! Each walkable cell is one polygon. Corridors come from an 8-connected A*
//! that never cuts blocked corners; the straight path pulls the corridor taut
//! with grid line-of-sight checks.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use glam::{Vec2, Vec3};
use ordered_float::OrderedFloat;

use crate::core::error::NavError;
use crate::core::types::{ground, lift};
use crate::nav::query::{NavLocation, NavMeshQuery, PolyId, TerrainQuery};
use crate::spatial::grid::Grid;

const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

/// (dx, dy, cost in cell units)
const NEIGHBORS: [(i64, i64, f32); 8] = [
    (1, 0, 1.0),
    (-1, 0, 1.0),
    (0, 1, 1.0),
    (0, -1, 1.0),
    (1, 1, DIAGONAL_COST),
    (1, -1, DIAGONAL_COST),
    (-1, 1, DIAGONAL_COST),
    (-1, -1, DIAGONAL_COST),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavCell {
    pub walkable: bool,
    pub height: f32,
}

impl Default for NavCell {
    fn default() -> Self {
        Self {
            walkable: true,
            height: 0.0,
        }
    }
}

/// Walkability and height map usable as both terrain and navigation surface
#[derive(Debug, Clone)]
pub struct NavGrid {
    cells: Grid<NavCell>,
}

impl NavGrid {
    /// Fully walkable flat grid with its minimum corner at `origin` (x, z)
    pub fn new(width: usize, height: usize, cell_size: f32, origin: Vec2) -> Self {
        Self {
            cells: Grid::new(width, height, cell_size, origin),
        }
    }

    /// Fully walkable flat grid centered on the world origin
    pub fn centered(width: usize, height: usize, cell_size: f32) -> Self {
        let origin = -Vec2::new(width as f32, height as f32) * cell_size * 0.5;
        Self::new(width, height, cell_size, origin)
    }

    pub fn width(&self) -> usize {
        self.cells.width
    }

    pub fn height(&self) -> usize {
        self.cells.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cells.cell_size
    }

    pub fn set_blocked(&mut self, x: usize, y: usize, blocked: bool) {
        if let Some(cell) = self.cells.get_mut(x, y) {
            cell.walkable = !blocked;
        }
    }

    /// Block every cell whose center lies inside the world-space rectangle
    pub fn block_rect(&mut self, min: Vec2, max: Vec2) {
        for y in 0..self.cells.height {
            for x in 0..self.cells.width {
                let c = self.cells.cell_center(x, y);
                if c.x >= min.x && c.x <= max.x && c.y >= min.y && c.y <= max.y {
                    self.set_blocked(x, y, true);
                }
            }
        }
    }

    pub fn set_height(&mut self, x: usize, y: usize, height: f32) {
        if let Some(cell) = self.cells.get_mut(x, y) {
            cell.height = height;
        }
    }

    /// Cell containing a world position
    pub fn cell_at(&self, position: Vec3) -> Option<(usize, usize)> {
        self.cells.cell_at(ground(position))
    }

    #[inline]
    pub fn is_walkable(&self, x: i64, y: i64) -> bool {
        self.cells.get_signed(x, y).is_some_and(|c| c.walkable)
    }

    fn poly_of(&self, x: usize, y: usize) -> PolyId {
        self.cells.index_of(x, y) as PolyId
    }

    fn poly_coords(&self, poly: PolyId) -> Option<(i64, i64)> {
        let index = poly as usize;
        if index >= self.cells.width * self.cells.height {
            return None;
        }
        let (x, y) = self.cells.coords_of(index);
        Some((x as i64, y as i64))
    }

    fn poly_center(&self, poly: PolyId) -> Option<Vec3> {
        let (x, y) = self.poly_coords(poly)?;
        let (x, y) = (x as usize, y as usize);
        let cell = self.cells.get(x, y)?;
        Some(lift(self.cells.cell_center(x, y), cell.height))
    }

    /// Octile distance in cell units
    fn heuristic(a: (i64, i64), b: (i64, i64)) -> f32 {
        let dx = (a.0 - b.0).abs() as f32;
        let dy = (a.1 - b.1).abs() as f32;
        dx.max(dy) + (DIAGONAL_COST - 1.0) * dx.min(dy)
    }

    /// True when the segment `a`-`b` only crosses walkable cells.
    ///
    /// Grid traversal; passing exactly through a cell corner requires both
    /// cells adjacent to that corner to be walkable.
    pub fn line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        let (Some(start), Some(end)) = (self.cells.cell_at(a), self.cells.cell_at(b)) else {
            return false;
        };
        let (mut x, mut y) = (start.0 as i64, start.1 as i64);
        let (ex, ey) = (end.0 as i64, end.1 as i64);

        let local = self.cells.to_grid_space(a);
        let delta = self.cells.to_grid_space(b) - local;
        let (step_x, t_delta_x, mut t_max_x) = traversal_axis(local.x, delta.x, x);
        let (step_y, t_delta_y, mut t_max_y) = traversal_axis(local.y, delta.y, y);

        let steps = (ex - x).abs() + (ey - y).abs();
        for _ in 0..=steps {
            if !self.is_walkable(x, y) {
                return false;
            }
            if x == ex && y == ey {
                return true;
            }
            if t_max_x < t_max_y {
                x += step_x;
                t_max_x += t_delta_x;
            } else if t_max_y < t_max_x {
                y += step_y;
                t_max_y += t_delta_y;
            } else {
                if !self.is_walkable(x + step_x, y) || !self.is_walkable(x, y + step_y) {
                    return false;
                }
                x += step_x;
                y += step_y;
                t_max_x += t_delta_x;
                t_max_y += t_delta_y;
            }
        }
        // Float drift walked past the end cell
        false
    }
}

/// Step direction, parametric cell width and first boundary crossing on one axis
fn traversal_axis(origin: f32, delta: f32, cell: i64) -> (i64, f32, f32) {
    if delta > 0.0 {
        (1, 1.0 / delta, ((cell + 1) as f32 - origin) / delta)
    } else if delta < 0.0 {
        (-1, -1.0 / delta, (origin - cell as f32) / -delta)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}

/// Reconstruct path from came_from map
fn reconstruct_corridor(came_from: &AHashMap<PolyId, PolyId>, mut current: PolyId, out: &mut Vec<PolyId>) {
    out.clear();
    out.push(current);
    while let Some(&prev) = came_from.get(&current) {
        out.push(prev);
        current = prev;
    }
    out.reverse();
}

impl TerrainQuery for NavGrid {
    fn ground_height(&self, position: Vec3) -> Option<f32> {
        let (x, y) = self.cell_at(position)?;
        self.cells.get(x, y).filter(|c| c.walkable).map(|c| c.height)
    }
}

impl NavMeshQuery for NavGrid {
    fn map_location(&self, position: Vec3, extents: Vec3) -> Option<NavLocation> {
        let p = ground(position);
        let size = self.cells.cell_size;
        let local = self.cells.to_grid_space(p);
        let (cx, cy) = (local.x.floor() as i64, local.y.floor() as i64);
        let rx = (extents.x / size).ceil() as i64;
        let ry = (extents.z / size).ceil() as i64;
        // Keeps snapped points strictly inside their cell
        let inset = Vec2::splat(size * 1e-3);

        let mut best: Option<(f32, NavLocation)> = None;
        for dy in -ry..=ry {
            for dx in -rx..=rx {
                let (x, y) = (cx + dx, cy + dy);
                let Some(cell) = self.cells.get_signed(x, y) else {
                    continue;
                };
                if !cell.walkable || (position.y - cell.height).abs() > extents.y {
                    continue;
                }
                let (min, max) = self.cells.cell_bounds(x as usize, y as usize);
                let nearest = p.clamp(min + inset, max - inset);
                let offset = (nearest - p).abs();
                if offset.x > extents.x || offset.y > extents.z {
                    continue;
                }
                let dist_sq = offset.length_squared();
                if best.map_or(true, |(d, _)| dist_sq < d) {
                    best = Some((
                        dist_sq,
                        NavLocation {
                            poly: self.poly_of(x as usize, y as usize),
                            position: lift(nearest, cell.height),
                        },
                    ));
                }
            }
        }
        best.map(|(_, location)| location)
    }

    fn find_corridor(
        &self,
        from: NavLocation,
        to: NavLocation,
        max_iterations: u32,
        corridor: &mut Vec<PolyId>,
    ) -> Result<(), NavError> {
        let (Some(start), Some(goal)) = (self.poly_coords(from.poly), self.poly_coords(to.poly)) else {
            return Err(NavError::InvalidMapPosition);
        };
        if from.poly == to.poly {
            corridor.clear();
            corridor.push(from.poly);
            return Ok(());
        }

        // Min-heap on f-cost; the push sequence breaks ties deterministically
        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<PolyId, PolyId> = AHashMap::new();
        let mut g_scores: AHashMap<PolyId, f32> = AHashMap::new();
        let mut sequence: u32 = 0;

        g_scores.insert(from.poly, 0.0);
        open_set.push(Reverse((OrderedFloat(Self::heuristic(start, goal)), sequence, from.poly)));

        let mut iterations = 0u32;
        while let Some(Reverse((f_cost, _, current))) = open_set.pop() {
            if current == to.poly {
                reconstruct_corridor(&came_from, current, corridor);
                return Ok(());
            }

            let (x, y) = self.poly_coords(current).ok_or(NavError::InvalidMapPosition)?;
            let current_g = *g_scores.get(&current).unwrap_or(&f32::INFINITY);
            // Superseded heap entry
            if f_cost.0 > current_g + Self::heuristic((x, y), goal) + 1e-4 {
                continue;
            }

            iterations += 1;
            if iterations > max_iterations {
                return Err(NavError::IterationBudgetExhausted);
            }

            for &(dx, dy, cost) in &NEIGHBORS {
                let (nx, ny) = (x + dx, y + dy);
                if !self.is_walkable(nx, ny) {
                    continue;
                }
                if dx != 0 && dy != 0 && (!self.is_walkable(x + dx, y) || !self.is_walkable(x, y + dy)) {
                    continue;
                }

                let neighbor = self.poly_of(nx as usize, ny as usize);
                let tentative_g = current_g + cost;
                let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current);
                    g_scores.insert(neighbor, tentative_g);
                    sequence += 1;
                    let f_cost = tentative_g + Self::heuristic((nx, ny), goal);
                    open_set.push(Reverse((OrderedFloat(f_cost), sequence, neighbor)));
                }
            }
        }

        Err(NavError::Unreachable)
    }

    fn straight_path(
        &self,
        from: Vec3,
        to: Vec3,
        corridor: &[PolyId],
        out: &mut Vec<Vec3>,
    ) -> Result<(), NavError> {
        out.clear();
        if corridor.is_empty() {
            return Err(NavError::Unreachable);
        }

        let goal = ground(to);
        let mut anchor = ground(from);
        let mut anchor_index = 0;
        out.push(from);

        while !self.line_of_sight(anchor, goal) {
            // Farthest corridor cell visible from the current corner
            let mut next = None;
            for j in (anchor_index + 1..corridor.len()).rev() {
                let Some(center) = self.poly_center(corridor[j]) else {
                    continue;
                };
                if self.line_of_sight(anchor, ground(center)) {
                    next = Some((j, center));
                    break;
                }
            }
            let Some((j, corner)) = next else {
                return Err(NavError::Unreachable);
            };
            out.push(corner);
            anchor = ground(corner);
            anchor_index = j;
        }

        out.push(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(grid: &NavGrid, x: f32, z: f32) -> NavLocation {
        grid.map_location(Vec3::new(x, 0.0, z), Vec3::new(1.0, 2.0, 1.0))
            .unwrap()
    }

    fn plan(grid: &NavGrid, from: Vec3, to: Vec3, budget: u32) -> Result<Vec<Vec3>, NavError> {
        let a = grid.map_location(from, Vec3::new(1.0, 2.0, 1.0)).unwrap();
        let b = grid.map_location(to, Vec3::new(1.0, 2.0, 1.0)).unwrap();
        let mut corridor = Vec::new();
        grid.find_corridor(a, b, budget, &mut corridor)?;
        let mut points = Vec::new();
        grid.straight_path(a.position, b.position, &corridor, &mut points)?;
        Ok(points)
    }

    #[test]
    fn test_open_grid_path_is_straight() {
        let grid = NavGrid::new(20, 20, 1.0, Vec2::ZERO);
        let points = plan(&grid, Vec3::new(0.5, 0.0, 0.5), Vec3::new(15.5, 0.0, 9.5), 256).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Vec3::new(0.5, 0.0, 0.5));
        assert_eq!(points[1], Vec3::new(15.5, 0.0, 9.5));
    }

    #[test]
    fn test_path_bends_around_wall() {
        let mut grid = NavGrid::new(20, 20, 1.0, Vec2::ZERO);
        // Wall along x = 10 with a gap at the top
        for y in 0..18 {
            grid.set_blocked(10, y, true);
        }
        let points = plan(&grid, Vec3::new(2.5, 0.0, 2.5), Vec3::new(17.5, 0.0, 2.5), 1024).unwrap();
        assert!(points.len() >= 3, "must turn at the gap: {:?}", points);
        for pair in points.windows(2) {
            assert!(grid.line_of_sight(ground(pair[0]), ground(pair[1])));
        }
        assert!(points.iter().any(|p| p.z >= 18.0));
    }

    #[test]
    fn test_enclosed_goal_is_unreachable() {
        let mut grid = NavGrid::new(10, 10, 1.0, Vec2::ZERO);
        for (x, y) in [(4, 4), (5, 4), (6, 4), (4, 5), (6, 5), (4, 6), (5, 6), (6, 6)] {
            grid.set_blocked(x, y, true);
        }
        let a = locate(&grid, 0.5, 0.5);
        let b = locate(&grid, 5.5, 5.5);
        let mut corridor = Vec::new();
        assert_eq!(grid.find_corridor(a, b, 256, &mut corridor), Err(NavError::Unreachable));
    }

    #[test]
    fn test_iteration_budget() {
        let grid = NavGrid::new(100, 1, 1.0, Vec2::ZERO);
        let a = locate(&grid, 0.5, 0.5);
        let b = locate(&grid, 99.5, 0.5);
        let mut corridor = Vec::new();
        assert_eq!(
            grid.find_corridor(a, b, 5, &mut corridor),
            Err(NavError::IterationBudgetExhausted)
        );
        assert!(grid.find_corridor(a, b, 256, &mut corridor).is_ok());
        assert_eq!(corridor.len(), 100);
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut grid = NavGrid::new(3, 3, 1.0, Vec2::ZERO);
        grid.set_blocked(1, 0, true);
        grid.set_blocked(0, 1, true);
        let a = locate(&grid, 0.5, 0.5);
        let b = locate(&grid, 1.5, 1.5);
        let mut corridor = Vec::new();
        assert_eq!(grid.find_corridor(a, b, 64, &mut corridor), Err(NavError::Unreachable));
        assert!(!grid.line_of_sight(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)));
    }

    #[test]
    fn test_map_location_snaps_within_extents() {
        let mut grid = NavGrid::new(10, 10, 1.0, Vec2::ZERO);
        grid.set_blocked(5, 5, true);
        let extents = Vec3::new(1.0, 2.0, 1.0);

        let snapped = grid.map_location(Vec3::new(5.5, 0.0, 5.5), extents).unwrap();
        assert_ne!(snapped.poly, grid.poly_of(5, 5));
        assert!(grid.line_of_sight(ground(snapped.position), ground(snapped.position)));

        assert!(grid.map_location(Vec3::new(-5.0, 0.0, 5.0), extents).is_none());
        assert!(grid.map_location(Vec3::new(5.5, 10.0, 2.5), extents).is_none(), "too far above");
    }

    #[test]
    fn test_terrain_height_and_holes() {
        let mut grid = NavGrid::centered(4, 4, 2.0);
        grid.set_height(0, 0, 3.0);
        grid.set_blocked(3, 3, true);
        assert_eq!(grid.ground_height(Vec3::new(-3.0, 0.0, -3.0)), Some(3.0));
        assert_eq!(grid.ground_height(Vec3::new(3.0, 0.0, 3.0)), None);
        assert_eq!(grid.ground_height(Vec3::new(30.0, 0.0, 0.0)), None);
    }
}
