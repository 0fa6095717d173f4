//! Incremental 2D linear program over constraint lines
//!
//! Finds the velocity closest to the preferred one that satisfies every
//! half-plane within the max-speed disc. When the constraints cannot all be
//! met, falls back to the sampled velocity with the least total violation.

use glam::Vec2;

use crate::avoidance::orca::Line;
use crate::core::types::cross;

const PARALLEL_EPSILON: f32 = 1e-6;

/// Least-violation fallback tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackParams {
    pub samples: u32,
    pub deviation_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub velocity: Vec2,
    /// Constraints were unsatisfiable and the fallback chose the velocity
    pub infeasible: bool,
}

/// Solve for a velocity inside `|v| <= max_speed` satisfying every line.
///
/// Deterministic for a given line order.
pub fn solve(lines: &[Line], preferred: Vec2, max_speed: f32, fallback: FallbackParams) -> Solution {
    let preferred = preferred.clamp_length_max(max_speed);
    let mut result = preferred;

    for (i, line) in lines.iter().enumerate() {
        if cross(line.direction, line.point - result) <= 0.0 {
            continue;
        }
        match solve_on_line(lines, i, max_speed, preferred) {
            Some(v) => result = v,
            None => {
                return Solution {
                    velocity: least_violation(lines, preferred, max_speed, fallback),
                    infeasible: true,
                };
            }
        }
    }

    Solution {
        velocity: result,
        infeasible: false,
    }
}

/// Best point on line `index` that respects lines `0..index` and the speed disc
fn solve_on_line(lines: &[Line], index: usize, max_speed: f32, preferred: Vec2) -> Option<Vec2> {
    let line = &lines[index];
    let dot = line.point.dot(line.direction);
    let discriminant = dot * dot + max_speed * max_speed - line.point.length_squared();
    if discriminant < 0.0 {
        // Max speed circle fully invalidates this line
        return None;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let mut t_left = -dot - sqrt_discriminant;
    let mut t_right = -dot + sqrt_discriminant;

    for other in &lines[..index] {
        let denominator = cross(line.direction, other.direction);
        let numerator = cross(other.direction, line.point - other.point);

        if denominator.abs() <= PARALLEL_EPSILON {
            if numerator < 0.0 {
                return None;
            }
            continue;
        }

        let t = numerator / denominator;
        if denominator >= 0.0 {
            // Other line bounds this one on the right
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }

        if t_left > t_right {
            return None;
        }
    }

    let t = line.direction.dot(preferred - line.point).max(t_left).min(t_right);
    Some(line.point + t * line.direction)
}

/// Total squared violation plus a pull toward the preferred velocity
fn penalty(lines: &[Line], candidate: Vec2, preferred: Vec2, weight: f32) -> f32 {
    let violation: f32 = lines
        .iter()
        .map(|line| {
            let v = line.violation(candidate);
            v * v
        })
        .sum();
    violation + weight * candidate.distance_squared(preferred)
}

/// Sample the max-speed circle and the clamped preferred velocity; keep the
/// lowest penalty. Earlier samples win ties.
fn least_violation(lines: &[Line], preferred: Vec2, max_speed: f32, params: FallbackParams) -> Vec2 {
    let mut best = preferred;
    let mut best_penalty = penalty(lines, preferred, preferred, params.deviation_weight);

    let samples = params.samples.max(1);
    for s in 0..samples {
        let angle = s as f32 / samples as f32 * std::f32::consts::TAU;
        let candidate = Vec2::new(angle.cos(), angle.sin()) * max_speed;
        let p = penalty(lines, candidate, preferred, params.deviation_weight);
        if p < best_penalty {
            best_penalty = p;
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FALLBACK: FallbackParams = FallbackParams {
        samples: 16,
        deviation_weight: 0.1,
    };

    fn line(px: f32, py: f32, dx: f32, dy: f32) -> Line {
        Line {
            point: Vec2::new(px, py),
            direction: Vec2::new(dx, dy).normalize(),
        }
    }

    #[test]
    fn test_no_constraints_returns_preferred() {
        let out = solve(&[], Vec2::new(3.0, 4.0), 10.0, FALLBACK);
        assert_eq!(out.velocity, Vec2::new(3.0, 4.0));
        assert!(!out.infeasible);
    }

    #[test]
    fn test_preferred_is_clamped_to_max_speed() {
        let out = solve(&[], Vec2::new(30.0, 40.0), 10.0, FALLBACK);
        assert!((out.velocity.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_projects_onto_violated_line() {
        // Permitted: y >= 1 (left of +x direction through (0, 1))
        let lines = [line(0.0, 1.0, 1.0, 0.0)];
        let out = solve(&lines, Vec2::new(2.0, 0.0), 10.0, FALLBACK);
        assert!(!out.infeasible);
        assert!((out.velocity - Vec2::new(2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_satisfied_line_leaves_preferred() {
        let lines = [line(0.0, -1.0, 1.0, 0.0)];
        let out = solve(&lines, Vec2::new(2.0, 0.0), 10.0, FALLBACK);
        assert_eq!(out.velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_two_lines_meet_at_corner() {
        // y >= 1 and x <= -1
        let lines = [line(0.0, 1.0, 1.0, 0.0), line(-1.0, 0.0, 0.0, 1.0)];
        let out = solve(&lines, Vec2::ZERO, 10.0, FALLBACK);
        assert!(!out.infeasible);
        assert!((out.velocity - Vec2::new(-1.0, 1.0)).length() < 1e-4);
    }

    #[test]
    fn test_contradictory_lines_use_least_violation() {
        // y >= 1 and y <= -1 cannot both hold
        let lines = [line(0.0, 1.0, 1.0, 0.0), line(0.0, -1.0, -1.0, 0.0)];
        let out = solve(&lines, Vec2::new(1.0, 0.0), 5.0, FALLBACK);
        assert!(out.infeasible);
        assert!(out.velocity.is_finite());
        assert!(out.velocity.length() <= 5.0 + 1e-4);
    }

    #[test]
    fn test_fallback_weighs_lines_after_the_failing_one() {
        // y >= 1 and y <= -1 conflict; x <= -2 comes after the conflict
        let lines = [
            line(0.0, 1.0, 1.0, 0.0),
            line(0.0, -1.0, -1.0, 0.0),
            line(-2.0, 0.0, 0.0, 1.0),
        ];
        let out = solve(&lines, Vec2::new(1.0, 0.0), 5.0, FALLBACK);
        assert!(out.infeasible);

        let total: f32 = lines.iter().map(|l| l.violation(out.velocity).powi(2)).sum();
        assert!(total < 2.01, "total squared violation {}", total);
        assert!(out.velocity.x < -2.0);
    }

    #[test]
    fn test_line_outside_speed_disc_is_infeasible() {
        // Requires y >= 20 with max speed 5
        let lines = [line(0.0, 20.0, 1.0, 0.0)];
        let out = solve(&lines, Vec2::ZERO, 5.0, FALLBACK);
        assert!(out.infeasible);
        // Best sample points straight at the permitted side
        assert!(out.velocity.y > 4.9);
    }

    #[test]
    fn test_deterministic() {
        let lines = [line(0.3, 1.0, 1.0, 0.2), line(-1.0, 0.1, 0.1, 1.0), line(0.0, -2.0, -1.0, 0.3)];
        let a = solve(&lines, Vec2::new(1.0, -1.0), 4.0, FALLBACK);
        let b = solve(&lines, Vec2::new(1.0, -1.0), 4.0, FALLBACK);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_velocity_is_bounded_and_finite(
            raw in proptest::collection::vec((-10.0f32..10.0, -10.0f32..10.0, -1.0f32..1.0, -1.0f32..1.0), 0..12),
            pref in (-20.0f32..20.0, -20.0f32..20.0),
            max_speed in 0.1f32..15.0,
        ) {
            let lines: Vec<Line> = raw
                .into_iter()
                .filter(|&(_, _, dx, dy)| dx * dx + dy * dy > 1e-3)
                .map(|(px, py, dx, dy)| line(px, py, dx, dy))
                .collect();
            let out = solve(&lines, Vec2::new(pref.0, pref.1), max_speed, FALLBACK);
            prop_assert!(out.velocity.is_finite());
            prop_assert!(out.velocity.length() <= max_speed * 1.001 + 1e-4);
        }

        #[test]
        fn prop_feasible_solution_satisfies_every_line(
            raw in proptest::collection::vec((-3.0f32..3.0, -3.0f32..3.0, -1.0f32..1.0, -1.0f32..1.0), 1..8),
            pref in (-5.0f32..5.0, -5.0f32..5.0),
        ) {
            let lines: Vec<Line> = raw
                .into_iter()
                .filter(|&(_, _, dx, dy)| dx * dx + dy * dy > 1e-2)
                .map(|(px, py, dx, dy)| line(px, py, dx, dy))
                .collect();
            let out = solve(&lines, Vec2::new(pref.0, pref.1), 10.0, FALLBACK);
            if !out.infeasible {
                for l in &lines {
                    prop_assert!(l.violation(out.velocity) < 1e-3);
                }
            }
        }
    }
}
