//! Headless Battle
//!
//! Spawns two armies on an open grid, orders them to advance on each other,
//! and runs the tick loop without rendering.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use swarm_tactics::agent::AgentSpawn;
use swarm_tactics::core::{AgentId, SimulationConfig, TeamId};
use swarm_tactics::nav::NavGrid;
use swarm_tactics::simulation::{DamageEvent, DamageSink, Environment, SimCounters, SimulationWorld};

/// Headless Battle - two armies, no rendering
#[derive(Parser, Debug)]
#[command(name = "headless_battle")]
#[command(about = "Run a two-army battle without rendering and report tick counters")]
struct Args {
    /// Agents per team
    #[arg(long, default_value_t = 500)]
    agents: usize,

    /// Ticks to simulate
    #[arg(long, default_value_t = 1500)]
    ticks: u64,

    /// Random seed for spawn jitter
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// TOML config file (missing keys use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Map edge length in world units
    #[arg(long, default_value_t = 256)]
    width: usize,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct BattleSummary {
    seed: u64,
    ticks: u64,
    agents_per_team: usize,
    survivors: [usize; 2],
    kills: usize,
    counters: SimCounters,
    mean_tick_ms: f64,
    max_tick_ms: f64,
}

/// Counts lethal hits
#[derive(Default)]
struct KillFeed {
    kills: usize,
}

impl DamageSink for KillFeed {
    fn on_damage(&mut self, event: &DamageEvent) {
        if event.lethal {
            self.kills += 1;
            tracing::debug!(tick = event.tick, source = %event.source, target = %event.target, "kill");
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match SimulationConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };

    let mut world = match SimulationWorld::with_capacity(config, args.agents * 2) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let grid = NavGrid::centered(args.width, args.width, 1.0);
    let env = Environment::new(&grid, &grid);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let half = args.width as f32 * 0.5;
    let fronts = [-half * 0.6, half * 0.6];
    let mut armies: [Vec<AgentId>; 2] = [Vec::new(), Vec::new()];
    for (team, &front) in fronts.iter().enumerate() {
        for position in block_positions(args.agents, front, &mut rng) {
            match world.spawn(AgentSpawn::new(TeamId(team as u32), position)) {
                Ok(id) => armies[team].push(id),
                Err(e) => tracing::warn!("spawn failed: {}", e),
            }
        }
    }

    for (team, army) in armies.iter().enumerate() {
        let objective = Vec3::new(fronts[1 - team], 0.0, 0.0);
        if let Err(e) = world.issue_group_move_order(army, objective) {
            tracing::warn!(team, "group order failed: {}", e);
        }
    }

    tracing::info!(
        agents = world.agent_count(),
        ticks = args.ticks,
        seed = args.seed,
        "Starting headless battle"
    );

    let mut feed = KillFeed::default();
    let mut total_ms = 0.0;
    let mut max_ms: f64 = 0.0;
    for _ in 0..args.ticks {
        let start = Instant::now();
        let stats = world.tick(&env, &mut feed);
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        total_ms += ms;
        max_ms = max_ms.max(ms);

        if stats.tick % 250 == 0 {
            tracing::info!(
                tick = stats.tick,
                live = stats.live_agents,
                attacks = stats.attacks,
                paths = stats.paths_computed,
                infeasible = stats.infeasible_avoidance,
                "progress"
            );
        }
    }

    let survivors = [0, 1].map(|team| {
        world
            .agents()
            .iter()
            .filter(|a| a.is_alive() && a.team == TeamId(team))
            .count()
    });
    let summary = BattleSummary {
        seed: args.seed,
        ticks: args.ticks,
        agents_per_team: args.agents,
        survivors,
        kills: feed.kills,
        counters: *world.counters(),
        mean_tick_ms: if args.ticks > 0 { total_ms / args.ticks as f64 } else { 0.0 },
        max_tick_ms: max_ms,
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize summary: {}", e),
        }
    } else {
        println!("=== Battle Summary (seed {}) ===", summary.seed);
        println!("Ticks:           {}", summary.ticks);
        println!("Survivors:       {} vs {}", survivors[0], survivors[1]);
        println!("Kills:           {}", summary.kills);
        println!("Attacks:         {}", summary.counters.attacks);
        println!("Paths computed:  {}", summary.counters.paths_computed);
        println!("Path fallbacks:  {}", summary.counters.path_fallbacks);
        println!("Pool exhausted:  {}", summary.counters.pool_exhausted);
        println!("Infeasible ORCA: {}", summary.counters.infeasible_avoidance);
        println!("Tick time:       {:.3} ms mean, {:.3} ms max", summary.mean_tick_ms, max_ms);
    }
}

/// Square block of `count` positions centered on (front, 0) with small jitter
fn block_positions(count: usize, front: f32, rng: &mut ChaCha8Rng) -> Vec<Vec3> {
    const SPACING: f32 = 1.5;
    let side = (count as f32).sqrt().ceil().max(1.0) as usize;
    let extent = (side - 1) as f32 * SPACING * 0.5;
    (0..count)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            Vec3::new(
                front - extent + col as f32 * SPACING + rng.gen_range(-0.3..0.3),
                0.0,
                -extent + row as f32 * SPACING + rng.gen_range(-0.3..0.3),
            )
        })
        .collect()
}
