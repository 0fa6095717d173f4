//! Waypoint following and kinematic integration
//!
//! Steering runs before avoidance and only writes the preferred velocity.
//! Integration runs after avoidance and applies the chosen velocity.

use glam::{Vec2, Vec3};

use crate::agent::state::Agent;
use crate::agent::store::AgentStore;
use crate::core::config::SimulationConfig;
use crate::core::types::{dist_sq_xz, ground};
use crate::nav::query::TerrainQuery;
use crate::simulation::parallel;

/// Point the agent is currently heading for.
///
/// Advances the waypoint cursor once the current waypoint is reached. A
/// truncated route requests a fresh path when its last point is reached.
pub fn steering_target(agent: &mut Agent, config: &SimulationConfig) -> Vec3 {
    if !agent.path.has_route() {
        return agent.destination;
    }

    let arrival_sq = arrival_distance_sq(config);
    let waypoints = &mut agent.path.waypoints;
    if let Some(current) = waypoints.current() {
        if dist_sq_xz(agent.position, current) <= arrival_sq {
            waypoints.advance();
        }
    }

    if waypoints.on_final_leg() {
        if waypoints.is_truncated() {
            let last = waypoints.current().unwrap_or(agent.destination);
            if dist_sq_xz(agent.position, last) <= arrival_sq {
                agent.path.request_repath();
                return agent.destination;
            }
            return last;
        }
        return agent.destination;
    }

    waypoints.current().unwrap_or(agent.destination)
}

#[inline]
fn arrival_distance_sq(config: &SimulationConfig) -> f32 {
    (config.arrival_distance * config.arrival_distance).max(0.01)
}

/// Write the preferred velocity for this tick
pub fn steer(agent: &mut Agent, config: &SimulationConfig) {
    let target = steering_target(agent, config);

    if dist_sq_xz(agent.position, agent.destination) <= arrival_distance_sq(config) {
        agent.motion.preferred_velocity = Vec2::ZERO;
        return;
    }

    let to_target = ground(target) - ground(agent.position);
    agent.motion.preferred_velocity = if to_target.length_squared() > 1e-8 {
        to_target.normalize() * agent.motion.max_speed
    } else {
        Vec2::ZERO
    };
}

/// Advance position by the avoidance velocity, turn to face it, and snap to
/// the ground. Height is kept where the terrain reports no ground.
pub fn integrate(agent: &mut Agent, terrain: &dyn TerrainQuery, config: &SimulationConfig) {
    let velocity = agent.motion.velocity;
    let step = velocity * config.tick_duration;
    agent.position.x += step.x;
    agent.position.z += step.y;

    if velocity.length_squared() > config.min_facing_speed_sq {
        agent.heading = velocity.normalize();
    }

    if let Some(height) = terrain.ground_height(agent.position) {
        agent.position.y = height;
    }
}

pub fn run_steering(agents: &mut AgentStore, config: &SimulationConfig) {
    let live = agents.len();
    parallel::for_each_living(agents.slots_mut(), live, config, |agent| steer(agent, config));
}

pub fn run_integration(agents: &mut AgentStore, terrain: &dyn TerrainQuery, config: &SimulationConfig) {
    let live = agents.len();
    parallel::for_each_living(agents.slots_mut(), live, config, |agent| {
        integrate(agent, terrain, config)
    });
}
