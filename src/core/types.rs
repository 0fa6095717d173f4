//! Core type definitions used throughout the codebase

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Stable handle to an agent: slot index plus the generation that slot had
/// when the agent was created.
///
/// A handle whose generation no longer matches its slot refers to a destroyed
/// agent and resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId {
    pub index: u32,
    pub generation: u32,
}

impl AgentId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Team identifier; agents never target members of their own team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u32);

/// Simulation tick counter
pub type Tick = u64;

/// Project a world position onto the ground plane (x, z)
#[inline]
pub fn ground(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Lift a ground-plane vector back into world space with the given height
#[inline]
pub fn lift(v: Vec2, y: f32) -> Vec3 {
    Vec3::new(v.x, y, v.y)
}

/// Squared distance between two world positions, ignoring height
#[inline]
pub fn dist_sq_xz(a: Vec3, b: Vec3) -> f32 {
    ground(a).distance_squared(ground(b))
}

/// 2D cross product (z component of the 3D cross product)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_equality_includes_generation() {
        let a = AgentId::new(3, 0);
        let b = AgentId::new(3, 0);
        let c = AgentId::new(3, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.slot(), 3);
    }

    #[test]
    fn test_dist_sq_ignores_height() {
        let a = Vec3::new(0.0, 100.0, 0.0);
        let b = Vec3::new(3.0, -5.0, 4.0);
        assert_eq!(dist_sq_xz(a, b), 25.0);
    }

    #[test]
    fn test_cross_sign() {
        // Positive when b is counter-clockwise from a
        assert!(cross(Vec2::X, Vec2::Y) > 0.0);
        assert!(cross(Vec2::Y, Vec2::X) < 0.0);
        assert_eq!(cross(Vec2::X, Vec2::X * 2.0), 0.0);
    }

    #[test]
    fn test_ground_and_lift() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(ground(p), Vec2::new(1.0, 3.0));
        assert_eq!(lift(ground(p), 2.0), p);
    }
}
