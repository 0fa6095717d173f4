//! Tick system - orchestrates simulation updates
//!
//! Phase order within a tick:
//! flush commands -> rebuild spatial index -> targeting -> behavior ->
//! pathing -> steering -> avoidance -> integration
//!
//! Each phase completes for every agent before the next one starts. Phases
//! that only write the agent being processed use rayon once the live count
//! reaches the configured threshold.

use crate::avoidance;
use crate::behavior;
use crate::movement;
use crate::simulation::commands::DamageSink;
use crate::simulation::stats::TickStats;
use crate::simulation::world::{Environment, SimulationWorld};
use crate::targeting;

/// Advance the world by one fixed tick
pub fn run_tick(world: &mut SimulationWorld, env: &Environment<'_>, sink: &mut dyn DamageSink) -> TickStats {
    let tick = world.current_tick;
    let mut stats = TickStats::new(tick);

    world.flush_commands(env, sink, &mut stats);

    world.index.rebuild(&world.agents);
    stats.live_agents = world.index.len();

    let targeting_bucket = world.active_targeting_bucket();
    stats.targeting_processed =
        targeting::run_targeting(&mut world.agents, &world.index, targeting_bucket, &world.config);

    let (attacks, behavior_stats) = behavior::run_behavior(&mut world.agents, &world.index, tick, &world.config);
    stats.attacks = behavior_stats.attacks;
    stats.stale_targets = behavior_stats.stale_targets;
    world.commands.extend(attacks);

    let pathing_bucket = world.active_pathing_bucket();
    let path_stats = world
        .scheduler
        .run(&mut world.agents, env.navmesh, pathing_bucket, tick, &world.config);
    stats.pathing_processed = path_stats.processed;
    stats.paths_computed = path_stats.computed;
    stats.path_fallbacks = path_stats.fallbacks;
    stats.invalid_map_positions = path_stats.invalid_map_positions;
    stats.pool_exhausted = path_stats.pool_exhausted;
    stats.slots_released = path_stats.slots_released;

    movement::run_steering(&mut world.agents, &world.config);

    let avoidance_stats = avoidance::run_avoidance(&mut world.agents, &world.index, &world.config);
    stats.infeasible_avoidance = avoidance_stats.infeasible;
    stats.constraints_dropped = avoidance_stats.constraints_dropped;

    movement::run_integration(&mut world.agents, env.terrain, &world.config);

    world.current_tick += 1;
    world.counters.absorb(&stats);

    tracing::trace!(
        tick,
        live = stats.live_agents,
        targeting = stats.targeting_processed,
        pathing = stats.pathing_processed,
        attacks = stats.attacks,
        deaths = stats.deaths,
        "tick complete"
    );
    stats
}
