//! Reproducibility and bucket scheduling across whole runs

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use swarm_tactics::agent::{AgentSpawn, BehaviorState};
use swarm_tactics::core::{AgentId, SimulationConfig, TeamId};
use swarm_tactics::nav::NavGrid;
use swarm_tactics::simulation::{DamageEvent, Environment, NullDamageSink, SimulationWorld};

fn skirmish(config: SimulationConfig, seed: u64) -> SimulationWorld {
    let mut world = SimulationWorld::new(config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut armies: [Vec<AgentId>; 2] = [Vec::new(), Vec::new()];
    for (team, army) in armies.iter_mut().enumerate() {
        let front = if team == 0 { -10.0 } else { 10.0 };
        for i in 0..100 {
            let position = Vec3::new(
                front + (i % 10) as f32 * 1.5 - 6.75 + rng.gen_range(-0.2..0.2),
                0.0,
                (i / 10) as f32 * 1.5 - 6.75 + rng.gen_range(-0.2..0.2),
            );
            let spawn = AgentSpawn {
                attack_rate: rng.gen_range(0.3..0.8),
                ..AgentSpawn::new(TeamId(team as u32), position)
            };
            army.push(world.spawn(spawn).unwrap());
        }
    }
    world.issue_group_move_order(&armies[0], Vec3::new(10.0, 0.0, 0.0)).unwrap();
    world.issue_group_move_order(&armies[1], Vec3::new(-10.0, 0.0, 0.0)).unwrap();
    world
}

fn run(world: &mut SimulationWorld, ticks: u64) -> Vec<DamageEvent> {
    let grid = NavGrid::centered(80, 80, 1.0);
    let env = Environment::new(&grid, &grid);
    let mut events = Vec::new();
    for _ in 0..ticks {
        world.tick(&env, &mut events);
    }
    events
}

fn assert_same(a: &SimulationWorld, b: &SimulationWorld) {
    assert_eq!(a.current_tick, b.current_tick);
    assert_eq!(a.agent_count(), b.agent_count());
    for (x, y) in a.agents().iter().zip(b.agents().iter()) {
        assert_eq!(x, y);
    }
    assert_eq!(a.counters(), b.counters());
}

#[test]
fn test_identical_runs_match() {
    let mut first = skirmish(SimulationConfig::default(), 7);
    let mut second = skirmish(SimulationConfig::default(), 7);
    let events_a = run(&mut first, 300);
    let events_b = run(&mut second, 300);

    assert!(!events_a.is_empty(), "armies should have made contact");
    assert_eq!(events_a, events_b);
    assert_same(&first, &second);
}

#[test]
fn test_parallel_phases_match_sequential() {
    let parallel = SimulationConfig {
        parallel_threshold: 1,
        parallel_chunk_size: 16,
        ..Default::default()
    };
    let mut sequential_world = skirmish(SimulationConfig::default(), 11);
    let mut parallel_world = skirmish(parallel, 11);
    let events_a = run(&mut sequential_world, 300);
    let events_b = run(&mut parallel_world, 300);

    assert_eq!(events_a, events_b);
    assert_same(&sequential_world, &parallel_world);
}

#[test]
fn test_new_enemy_seen_only_on_own_bucket() {
    let grid = NavGrid::centered(40, 40, 1.0);
    let env = Environment::new(&grid, &grid);
    let config = SimulationConfig {
        targeting_buckets: 4,
        ..Default::default()
    };
    let mut world = SimulationWorld::new(config).unwrap();
    let watcher = world.spawn(AgentSpawn::new(TeamId(0), Vec3::ZERO)).unwrap();
    assert_eq!(world.agent(watcher).unwrap().buckets.targeting, 0);

    world.tick(&env, &mut NullDamageSink);
    let enemy = world
        .spawn(AgentSpawn {
            vision_range: 0.0,
            ..AgentSpawn::new(TeamId(1), Vec3::new(3.0, 0.0, 0.0))
        })
        .unwrap();

    for tick in 1..4 {
        let stats = world.tick(&env, &mut NullDamageSink);
        assert_eq!(stats.tick, tick);
        let agent = world.agent(watcher).unwrap();
        assert_eq!(agent.target.target, None, "stale until bucket 0 comes round (tick {})", tick);
        assert_eq!(agent.state, BehaviorState::Idle);
    }

    let stats = world.tick(&env, &mut NullDamageSink);
    assert_eq!(stats.tick, 4);
    let agent = world.agent(watcher).unwrap();
    assert_eq!(agent.target.target, Some(enemy));
    assert_eq!(agent.state, BehaviorState::Chase);
}
