//! Local collision avoidance (ORCA)
//!
//! Reads neighbors from the start-of-tick spatial index and writes only the
//! processed agent's velocity, so agents are solved independently.

pub mod orca;
pub mod solver;

use crate::agent::state::Agent;
use crate::agent::store::AgentStore;
use crate::core::config::SimulationConfig;
use crate::core::types::ground;
use crate::simulation::parallel;
use crate::spatial::sparse_hash::SpatialIndex;

pub use orca::{build_constraints, reciprocal_line, Body, ConstraintLines, Line};
pub use solver::{solve, FallbackParams, Solution};

/// Per-tick counters of the avoidance phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvoidanceStats {
    pub infeasible: usize,
    pub constraints_dropped: usize,
}

/// Choose a collision-free velocity for one agent from its preferred velocity
pub fn avoid(agent: &Agent, index: &SpatialIndex, config: &SimulationConfig) -> (Solution, usize) {
    let me = Body {
        id: agent.id,
        position: ground(agent.position),
        velocity: agent.motion.velocity,
        radius: agent.motion.radius,
    };
    let neighbors = index.query_neighborhood(agent.position, config.avoidance_cell_radius);
    let (lines, dropped) = build_constraints(&me, neighbors, config);

    let fallback = FallbackParams {
        samples: config.least_violation_samples,
        deviation_weight: config.preferred_deviation_weight,
    };
    let solution = solve(&lines, agent.motion.preferred_velocity, agent.motion.max_speed, fallback);
    (solution, dropped)
}

/// Run avoidance for every living agent and store the chosen velocities
pub fn run_avoidance(agents: &mut AgentStore, index: &SpatialIndex, config: &SimulationConfig) -> AvoidanceStats {
    let live = agents.len();
    let outcomes = parallel::filter_map_living(agents.slots_mut(), live, config, |agent| {
        let (solution, dropped) = avoid(agent, index, config);
        agent.motion.velocity = solution.velocity;
        (solution.infeasible || dropped > 0).then_some((solution.infeasible, dropped))
    });

    let mut stats = AvoidanceStats::default();
    for (infeasible, dropped) in outcomes {
        if infeasible {
            stats.infeasible += 1;
        }
        stats.constraints_dropped += dropped;
    }
    if stats.infeasible > 0 {
        tracing::trace!(agents = stats.infeasible, "avoidance fell back to least violation");
    }
    stats
}
