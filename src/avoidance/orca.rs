//! Reciprocal velocity obstacle constraint lines
//!
//! Each neighbor contributes one half-plane of permitted velocities, bounded
//! by a directed line. Permitted velocities lie to the left of the direction.
//! Each side of a pair takes half of the required avoidance.

use arrayvec::ArrayVec;
use glam::Vec2;
use ordered_float::OrderedFloat;

use crate::core::config::{SimulationConfig, MAX_CONSTRAINT_LINES};
use crate::core::types::{cross, ground, AgentId};
use crate::spatial::sparse_hash::AgentSnapshot;

/// Directed boundary of a half-plane of permitted velocities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub point: Vec2,
    /// Unit direction; the permitted side is to its left
    pub direction: Vec2,
}

impl Line {
    /// How far `velocity` lies on the forbidden side (0 when permitted)
    #[inline]
    pub fn violation(&self, velocity: Vec2) -> f32 {
        cross(self.direction, self.point - velocity).max(0.0)
    }
}

pub type ConstraintLines = ArrayVec<Line, MAX_CONSTRAINT_LINES>;

/// Agent side of a pairwise constraint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: AgentId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

impl From<&AgentSnapshot> for Body {
    fn from(snapshot: &AgentSnapshot) -> Self {
        Self {
            id: snapshot.id,
            position: ground(snapshot.position),
            velocity: snapshot.velocity,
            radius: snapshot.radius,
        }
    }
}

/// Half-plane that `me` must respect to avoid `other` within `time_horizon`.
///
/// When the bodies already overlap the constraint separates them within a
/// single tick of `tick_duration` instead.
pub fn reciprocal_line(me: &Body, other: &Body, time_horizon: f32, tick_duration: f32) -> Line {
    let relative_position = other.position - me.position;
    let relative_velocity = me.velocity - other.velocity;
    let dist_sq = relative_position.length_squared();
    let combined_radius = me.radius + other.radius;
    let combined_radius_sq = combined_radius * combined_radius;

    let (direction, u) = if dist_sq > combined_radius_sq {
        let inv_time_horizon = 1.0 / time_horizon;
        // Vector from cutoff center to relative velocity
        let w = relative_velocity - relative_position * inv_time_horizon;
        let w_length_sq = w.length_squared();
        let dot = w.dot(relative_position);

        if dot < 0.0 && dot * dot > combined_radius_sq * w_length_sq {
            // Project on cut-off circle
            let w_length = w_length_sq.sqrt();
            let unit_w = w / w_length;
            let direction = Vec2::new(unit_w.y, -unit_w.x);
            let u = (combined_radius * inv_time_horizon - w_length) * unit_w;
            (direction, u)
        } else {
            // Project on legs
            let leg = (dist_sq - combined_radius_sq).sqrt();
            let direction = if cross(relative_position, w) > 0.0 {
                Vec2::new(
                    relative_position.x * leg - relative_position.y * combined_radius,
                    relative_position.x * combined_radius + relative_position.y * leg,
                ) / dist_sq
            } else {
                -Vec2::new(
                    relative_position.x * leg + relative_position.y * combined_radius,
                    -relative_position.x * combined_radius + relative_position.y * leg,
                ) / dist_sq
            };
            let u = relative_velocity.dot(direction) * direction - relative_velocity;
            (direction, u)
        }
    } else {
        let inv_dt = 1.0 / tick_duration;
        let w = relative_velocity - relative_position * inv_dt;
        let w_length = w.length();
        let unit_w = if w_length > f32::EPSILON {
            w / w_length
        } else if me.id < other.id {
            // Coincident and relatively still; the id order picks opposite sides
            Vec2::X
        } else {
            Vec2::NEG_X
        };
        let direction = Vec2::new(unit_w.y, -unit_w.x);
        let u = (combined_radius * inv_dt - w_length) * unit_w;
        (direction, u)
    };

    Line {
        point: me.velocity + 0.5 * u,
        direction,
    }
}

/// Build the constraint set for `me` from its neighborhood.
///
/// Neighbors are ordered nearest first (ties keep enumeration order) and
/// anything past `max_constraints` is dropped. Returns the lines and the
/// number of neighbors dropped by the cap.
pub fn build_constraints<'a>(
    me: &Body,
    neighbors: impl Iterator<Item = &'a AgentSnapshot>,
    config: &SimulationConfig,
) -> (ConstraintLines, usize) {
    let mut candidates: Vec<(f32, Body)> = neighbors
        .filter(|s| s.id != me.id)
        .map(|s| {
            let body = Body::from(s);
            (body.position.distance_squared(me.position), body)
        })
        .collect();
    candidates.sort_by_key(|(d, _)| OrderedFloat(*d));

    let cap = config.max_constraints.min(MAX_CONSTRAINT_LINES);
    let dropped = candidates.len().saturating_sub(cap);

    let lines = candidates
        .iter()
        .take(cap)
        .map(|(_, other)| reciprocal_line(me, other, config.time_horizon, config.tick_duration))
        .collect();
    (lines, dropped)
}
