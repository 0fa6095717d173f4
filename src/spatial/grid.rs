//! Generic grid for spatial data

use glam::Vec2;

/// Dense 2D grid with configurable cell size, addressed on the ground plane
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    pub width: usize,
    pub height: usize,
    pub cell_size: f32,
    pub origin: Vec2,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize, cell_size: f32, origin: Vec2) -> Self {
        Self {
            width,
            height,
            cell_size,
            origin,
            data: vec![T::default(); width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            Some(&self.data[y * self.width + x])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x < self.width && y < self.height {
            Some(&mut self.data[y * self.width + x])
        } else {
            None
        }
    }

    /// Signed lookup; anything outside the grid is `None`
    #[inline]
    pub fn get_signed(&self, x: i64, y: i64) -> Option<&T> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    /// Row-major index of a cell
    #[inline]
    pub fn index_of(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Cell coordinates of a row-major index
    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Continuous grid coordinates of a world position (cell units)
    #[inline]
    pub fn to_grid_space(&self, pos: Vec2) -> Vec2 {
        (pos - self.origin) / self.cell_size
    }

    /// Cell containing a world position, or `None` outside the grid
    pub fn cell_at(&self, pos: Vec2) -> Option<(usize, usize)> {
        let local = self.to_grid_space(pos);
        let (x, y) = (local.x.floor(), local.y.floor());
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return None;
        }
        Some((x as usize, y as usize))
    }

    /// Cell center in world coordinates
    pub fn cell_center(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            self.origin.x + (x as f32 + 0.5) * self.cell_size,
            self.origin.y + (y as f32 + 0.5) * self.cell_size,
        )
    }

    /// World-space bounds (min, max) of a cell
    pub fn cell_bounds(&self, x: usize, y: usize) -> (Vec2, Vec2) {
        let min = self.origin + Vec2::new(x as f32, y as f32) * self.cell_size;
        (min, min + Vec2::splat(self.cell_size))
    }
}
