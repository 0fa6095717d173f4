//! Player orders
//!
//! Orders are validated against the current agent table when issued, queued,
//! and applied at the start of the next tick.

use glam::{Vec2, Vec3};

use crate::agent::state::{BehaviorState, TargetLock};
use crate::core::error::{Result, SimError};
use crate::core::types::{dist_sq_xz, ground, lift, AgentId};
use crate::nav::query::TerrainQuery;
use crate::simulation::commands::Command;
use crate::simulation::world::SimulationWorld;

/// Fraction of the group's mean spread inside which the formation is compressed
const FORMATION_SPREAD_FACTOR: f32 = 0.9;

/// Destinations that keep each agent's offset from the group centroid.
///
/// When `point` lands inside the group's own footprint the offsets are
/// halved, so the group tightens instead of swapping sides.
pub fn formation_destinations(positions: &[Vec3], point: Vec3) -> Vec<Vec3> {
    if positions.is_empty() {
        return Vec::new();
    }
    let count = positions.len() as f32;
    let center: Vec2 = positions.iter().map(|&p| ground(p)).sum::<Vec2>() / count;
    let spread = positions.iter().map(|&p| ground(p).distance(center)).sum::<f32>() / count
        * FORMATION_SPREAD_FACTOR;

    let target = ground(point);
    let scale = if target.distance(center) < spread { 0.5 } else { 1.0 };
    positions
        .iter()
        .map(|&p| lift((ground(p) - center) * scale + target, point.y))
        .collect()
}

impl SimulationWorld {
    /// Queue a move order for one agent
    pub fn issue_move_order(&mut self, agent: AgentId, destination: Vec3) -> Result<()> {
        if !self.agents.contains(agent) {
            return Err(SimError::UnknownAgent(agent));
        }
        self.enqueue(Command::Move { agent, destination });
        Ok(())
    }

    /// Queue move orders that keep the group's formation around `point`
    pub fn issue_group_move_order(&mut self, agents: &[AgentId], point: Vec3) -> Result<()> {
        let mut positions = Vec::with_capacity(agents.len());
        for &id in agents {
            let agent = self.agents.get(id).ok_or(SimError::UnknownAgent(id))?;
            positions.push(agent.position);
        }
        let destinations = formation_destinations(&positions, point);
        for (&agent, destination) in agents.iter().zip(destinations) {
            self.enqueue(Command::Move { agent, destination });
        }
        Ok(())
    }

    /// Queue an attack order; the lock persists until the target dies
    pub fn set_target(&mut self, agent: AgentId, target: AgentId) -> Result<()> {
        if !self.agents.contains(agent) {
            return Err(SimError::UnknownAgent(agent));
        }
        if !self.agents.contains(target) {
            return Err(SimError::UnknownAgent(target));
        }
        self.enqueue(Command::SetTarget { agent, target });
        Ok(())
    }

    /// Queue removal of an agent
    pub fn despawn(&mut self, agent: AgentId) -> Result<()> {
        if !self.agents.contains(agent) {
            return Err(SimError::UnknownAgent(agent));
        }
        self.enqueue(Command::Despawn { agent });
        Ok(())
    }

    /// Ground the destination and switch the agent to Move.
    ///
    /// Returns false if the agent is gone or there is no ground there.
    pub(crate) fn apply_move_order(&mut self, id: AgentId, destination: Vec3, terrain: &dyn TerrainQuery) -> bool {
        let Some(agent) = self.agents.get_mut(id).filter(|a| a.is_alive()) else {
            tracing::debug!(agent = %id, "move order for missing agent dropped");
            return false;
        };
        let Some(height) = terrain.ground_height(destination) else {
            tracing::debug!(agent = %id, destination = ?destination, "move order rejected: no ground");
            return false;
        };

        agent.destination = Vec3::new(destination.x, height, destination.z);
        agent.state = BehaviorState::Move;
        agent.target.clear();
        agent.path.waypoints.clear();
        agent.path.request_repath();
        true
    }

    /// Lock `target` as a forced target and start chasing it
    pub(crate) fn apply_set_target(&mut self, id: AgentId, target: AgentId) -> bool {
        let Some((target_pos, target_team)) = self
            .agents
            .get(target)
            .filter(|t| t.is_alive())
            .map(|t| (t.position, t.team))
        else {
            tracing::debug!(agent = %id, target = %target, "attack order rejected: target gone");
            return false;
        };
        let Some(agent) = self.agents.get_mut(id).filter(|a| a.is_alive()) else {
            return false;
        };
        if id == target || agent.team == target_team {
            tracing::debug!(agent = %id, target = %target, "attack order rejected: not an enemy");
            return false;
        }

        agent.target = TargetLock {
            target: Some(target),
            dist_sq: dist_sq_xz(agent.position, target_pos),
            forced: true,
        };
        agent.state = BehaviorState::Chase;
        agent.destination = target_pos;
        agent.path.request_repath();
        true
    }
}
