//! Per-agent behavior state machine
//!
//! Idle, Move, Chase and Attack. Transitions only touch the agent being
//! updated; damage to the target is returned as a command and applied at
//! the next flush.

use glam::Vec3;

use crate::agent::state::{Agent, BehaviorState, PathStatus};
use crate::agent::store::AgentStore;
use crate::core::config::SimulationConfig;
use crate::core::types::{dist_sq_xz, ground, Tick};
use crate::simulation::commands::Command;
use crate::simulation::parallel;
use crate::spatial::sparse_hash::SpatialIndex;

/// What one behavior update produced besides mutating the agent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BehaviorOutcome {
    pub attack: Option<Command>,
    /// The target lock pointed at a dead, destroyed or out-of-sight agent
    pub stale_target: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorStats {
    pub attacks: usize,
    pub stale_targets: usize,
}

/// Update every living agent; returns the damage commands in slot order
pub fn run_behavior(
    agents: &mut AgentStore,
    index: &SpatialIndex,
    tick: Tick,
    config: &SimulationConfig,
) -> (Vec<Command>, BehaviorStats) {
    let live = agents.len();
    let outcomes = parallel::filter_map_living(agents.slots_mut(), live, config, |agent| {
        let outcome = update(agent, index, tick, config);
        (outcome != BehaviorOutcome::default()).then_some(outcome)
    });

    let mut stats = BehaviorStats::default();
    let mut commands = Vec::new();
    for outcome in outcomes {
        if outcome.stale_target {
            stats.stale_targets += 1;
        }
        if let Some(attack) = outcome.attack {
            stats.attacks += 1;
            commands.push(attack);
        }
    }
    (commands, stats)
}

/// Position and current squared distance of the agent's target, if it is
/// still worth pursuing
fn resolve_target(agent: &Agent, index: &SpatialIndex) -> Option<(Vec3, f32)> {
    let id = agent.target.target?;
    let target = index.get(id)?;
    if target.hit_points <= 0 || target.team == agent.team {
        return None;
    }
    let dist_sq = dist_sq_xz(agent.position, target.position);
    if !agent.target.forced && dist_sq > agent.vision_range_sq() {
        return None;
    }
    Some((target.position, dist_sq))
}

/// Run one state machine step for `agent`
pub fn update(agent: &mut Agent, index: &SpatialIndex, tick: Tick, config: &SimulationConfig) -> BehaviorOutcome {
    let mut outcome = BehaviorOutcome::default();

    let target = resolve_target(agent, index);
    if target.is_none() && agent.target.target.is_some() {
        agent.target.clear();
        outcome.stale_target = true;
    }

    match agent.state {
        BehaviorState::Idle => match target {
            Some((target_pos, _)) => enter_chase(agent, target_pos),
            None if dist_sq_xz(agent.position, agent.destination) > config.resume_distance_sq => {
                agent.state = BehaviorState::Move;
                if agent.path.status == PathStatus::None {
                    agent.path.request_repath();
                }
            }
            None => {}
        },

        // Move orders ignore enemies until the destination is reached
        BehaviorState::Move => {
            if dist_sq_xz(agent.position, agent.destination) < config.stopping_distance_sq {
                enter_idle(agent, tick, false);
            }
        }

        BehaviorState::Chase => match target {
            None => enter_idle(agent, tick, true),
            Some((_, dist_sq)) if dist_sq <= agent.attack.range_sq => {
                agent.state = BehaviorState::Attack;
                hold_position(agent);
            }
            Some((target_pos, _)) => {
                if dist_sq_xz(target_pos, agent.destination) > config.repath_threshold_sq {
                    agent.destination = target_pos;
                    agent.path.request_repath();
                }
            }
        },

        BehaviorState::Attack => match target {
            None => enter_idle(agent, tick, true),
            Some((target_pos, dist_sq)) if dist_sq > agent.attack.range_sq * config.attack_hysteresis => {
                enter_chase(agent, target_pos);
            }
            Some((target_pos, _)) => {
                face(agent, target_pos);
                if agent.attack.is_ready(tick) {
                    agent.attack.last_attack = Some(tick);
                    if let Some(target) = agent.target.target {
                        outcome.attack = Some(Command::Damage {
                            source: agent.id,
                            target,
                            amount: agent.attack.damage,
                        });
                    }
                }
            }
        },
    }

    outcome
}

fn enter_chase(agent: &mut Agent, target_pos: Vec3) {
    agent.state = BehaviorState::Chase;
    agent.destination = target_pos;
    agent.path.request_repath();
}

/// `stop` pins the destination to the current position
fn enter_idle(agent: &mut Agent, tick: Tick, stop: bool) {
    agent.state = BehaviorState::Idle;
    agent.idle_since = tick;
    agent.path.reset();
    if stop {
        agent.destination = agent.position;
    }
}

fn hold_position(agent: &mut Agent) {
    agent.destination = agent.position;
    agent.path.reset();
}

fn face(agent: &mut Agent, target_pos: Vec3) {
    let to_target = ground(target_pos) - ground(agent.position);
    if to_target.length_squared() > 1e-8 {
        agent.heading = to_target.normalize();
    }
}
