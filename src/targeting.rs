//! Nearest-enemy target acquisition
//!
//! Runs for one targeting bucket per tick. Between refreshes an agent keeps
//! its last target even if a nearer enemy shows up; behavior validates the
//! target against the live index before acting on it.

use crate::agent::state::{Agent, TargetLock};
use crate::agent::store::AgentStore;
use crate::core::config::SimulationConfig;
use crate::core::types::dist_sq_xz;
use crate::simulation::parallel;
use crate::spatial::sparse_hash::SpatialIndex;

/// Refresh the target of every living agent in `bucket`.
///
/// Returns how many agents were processed.
pub fn run_targeting(agents: &mut AgentStore, index: &SpatialIndex, bucket: u32, config: &SimulationConfig) -> usize {
    let live = agents.len();
    parallel::count_living(agents.slots_mut(), live, config, |agent| {
        if agent.buckets.targeting != bucket {
            return false;
        }
        acquire_target(agent, index);
        true
    })
}

/// Write the nearest enemy within vision range into the agent's target lock.
///
/// A player-forced lock is kept while its target is still indexed.
pub fn acquire_target(agent: &mut Agent, index: &SpatialIndex) {
    if agent.target.forced {
        if let Some(target) = agent.target.target.and_then(|id| index.get(id)) {
            agent.target.dist_sq = dist_sq_xz(agent.position, target.position);
            return;
        }
    }

    let mut best = f32::INFINITY;
    let mut closest = None;
    for other in index.query_radius(agent.position, agent.vision_range) {
        if other.id == agent.id || other.team == agent.team {
            continue;
        }
        let d = dist_sq_xz(agent.position, other.position);
        if d < best {
            best = d;
            closest = Some(other.id);
        }
    }

    agent.target = TargetLock {
        target: closest,
        dist_sq: best,
        forced: false,
    };
}
