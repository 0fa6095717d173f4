//! Simulation context: agents, spatial index, path scheduler and command queue

use crate::agent::state::{Agent, AgentSpawn, Buckets, Vitality};
use crate::agent::store::AgentStore;
use crate::core::config::SimulationConfig;
use crate::core::error::{ConfigError, Result, SimError};
use crate::core::types::{AgentId, Tick};
use crate::nav::pool::QueryPool;
use crate::nav::query::{NavMeshQuery, TerrainQuery};
use crate::nav::scheduler::PathScheduler;
use crate::simulation::commands::{Command, CommandQueue, DamageEvent, DamageSink};
use crate::simulation::stats::{SimCounters, TickStats};
use crate::simulation::tick::run_tick;
use crate::spatial::sparse_hash::SpatialIndex;

/// External collaborators queried during a tick
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub terrain: &'a dyn TerrainQuery,
    pub navmesh: &'a dyn NavMeshQuery,
}

impl<'a> Environment<'a> {
    pub fn new(terrain: &'a dyn TerrainQuery, navmesh: &'a dyn NavMeshQuery) -> Self {
        Self { terrain, navmesh }
    }
}

/// The simulation state advanced by [`run_tick`]
pub struct SimulationWorld {
    pub current_tick: Tick,
    pub(crate) config: SimulationConfig,
    pub(crate) agents: AgentStore,
    pub(crate) index: SpatialIndex,
    pub(crate) scheduler: PathScheduler,
    pub(crate) commands: CommandQueue,
    pub(crate) counters: SimCounters,
    next_targeting_bucket: u32,
    next_pathing_bucket: u32,
}

impl SimulationWorld {
    pub fn new(config: SimulationConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_capacity(config, 0)
    }

    /// Like [`SimulationWorld::new`] with room for `agents` slots up front
    pub fn with_capacity(config: SimulationConfig, agents: usize) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            current_tick: 0,
            index: SpatialIndex::new(config.cell_size),
            scheduler: PathScheduler::new(&config),
            agents: AgentStore::with_capacity(agents),
            commands: CommandQueue::new(),
            counters: SimCounters::default(),
            next_targeting_bucket: 0,
            next_pathing_bucket: 0,
            config,
        })
    }

    /// Add an agent. Buckets are assigned round-robin in spawn order.
    pub fn spawn(&mut self, spawn: AgentSpawn) -> Result<AgentId> {
        validate_spawn(&spawn)?;

        let buckets = Buckets {
            targeting: self.next_targeting_bucket,
            pathing: self.next_pathing_bucket,
        };
        self.next_targeting_bucket = (self.next_targeting_bucket + 1) % self.config.targeting_buckets;
        self.next_pathing_bucket = (self.next_pathing_bucket + 1) % self.config.pathing_buckets;

        let cooldown_ticks = self.config.seconds_to_ticks(spawn.attack_rate);
        let now = self.current_tick;
        let id = self
            .agents
            .insert_with(|id| Agent::from_spawn(id, &spawn, buckets, cooldown_ticks, now));

        tracing::debug!(
            agent = %id,
            team = spawn.team.0,
            targeting_bucket = buckets.targeting,
            pathing_bucket = buckets.pathing,
            "spawned agent"
        );
        Ok(id)
    }

    /// Advance one tick
    pub fn tick(&mut self, env: &Environment<'_>, sink: &mut dyn DamageSink) -> TickStats {
        run_tick(self, env, sink)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    /// Agents stored, including dead ones awaiting destruction
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn living_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_alive()).count()
    }

    /// Index built at the start of the most recent tick
    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn query_pool(&self) -> &QueryPool {
        self.scheduler.pool()
    }

    pub fn counters(&self) -> &SimCounters {
        &self.counters
    }

    pub fn pending_commands(&self) -> &[Command] {
        self.commands.pending()
    }

    /// Targeting bucket processed by the next tick
    pub fn active_targeting_bucket(&self) -> u32 {
        (self.current_tick % self.config.targeting_buckets as u64) as u32
    }

    /// Pathing bucket processed by the next tick
    pub fn active_pathing_bucket(&self) -> u32 {
        (self.current_tick % self.config.pathing_buckets as u64) as u32
    }

    pub(crate) fn enqueue(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Apply every deferred change: expired corpses, then queued commands in
    /// FIFO order, then death tagging.
    pub(crate) fn flush_commands(&mut self, env: &Environment<'_>, sink: &mut dyn DamageSink, stats: &mut TickStats) {
        let tick = self.current_tick;
        let grace = self.config.despawn_grace_ticks;

        let expired: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|a| matches!(a.vitality, Vitality::Dead { since } if tick.saturating_sub(since) >= grace))
            .map(|a| a.id)
            .collect();
        for id in expired {
            if self.destroy(id) {
                stats.despawned += 1;
            }
        }

        for command in self.commands.take() {
            match command {
                Command::Damage { source, target, amount } => {
                    // A victim already at zero this flush is dead; later hits are dropped
                    let Some(victim) = self
                        .agents
                        .get_mut(target)
                        .filter(|a| a.is_alive() && a.hit_points > 0)
                    else {
                        continue;
                    };
                    victim.hit_points = victim.hit_points.saturating_sub(amount);
                    stats.damage_applied += 1;
                    sink.on_damage(&DamageEvent {
                        tick,
                        source,
                        target,
                        amount,
                        remaining_hp: victim.hit_points,
                        lethal: victim.hit_points <= 0,
                    });
                }
                Command::Move { agent, destination } => {
                    if !self.apply_move_order(agent, destination, env.terrain) {
                        stats.rejected_orders += 1;
                    }
                }
                Command::SetTarget { agent, target } => {
                    if !self.apply_set_target(agent, target) {
                        stats.rejected_orders += 1;
                    }
                }
                Command::Despawn { agent } => {
                    if self.destroy(agent) {
                        stats.despawned += 1;
                    }
                }
            }
        }

        for agent in self.agents.iter_mut().filter(|a| a.is_alive() && a.hit_points <= 0) {
            agent.vitality = Vitality::Dead { since: tick };
            stats.deaths += 1;
            tracing::debug!(agent = %agent.id, tick, "agent died");
        }
    }

    /// Remove an agent and return its query slot
    fn destroy(&mut self, id: AgentId) -> bool {
        match self.agents.remove(id) {
            Some(mut agent) => {
                self.scheduler.release_for(&mut agent);
                tracing::debug!(agent = %id, "despawned agent");
                true
            }
            None => false,
        }
    }
}

fn validate_spawn(spawn: &AgentSpawn) -> Result<()> {
    if !spawn.position.is_finite() {
        return Err(SimError::InvalidSpawn(format!("position {:?} is not finite", spawn.position)));
    }
    if !(spawn.radius > 0.0) || !spawn.radius.is_finite() {
        return Err(SimError::InvalidSpawn(format!("radius must be positive (got {})", spawn.radius)));
    }
    if !(spawn.max_speed >= 0.0) || !spawn.max_speed.is_finite() {
        return Err(SimError::InvalidSpawn(format!("max_speed must be >= 0 (got {})", spawn.max_speed)));
    }
    if spawn.hit_points <= 0 {
        return Err(SimError::InvalidSpawn(format!("hit_points must be positive (got {})", spawn.hit_points)));
    }
    for (name, value) in [
        ("attack_range", spawn.attack_range),
        ("vision_range", spawn.vision_range),
        ("attack_rate", spawn.attack_rate),
    ] {
        if !(value >= 0.0) || !value.is_finite() {
            return Err(SimError::InvalidSpawn(format!("{} must be finite and >= 0 (got {})", name, value)));
        }
    }
    if spawn.damage < 0 {
        return Err(SimError::InvalidSpawn(format!("damage must be >= 0 (got {})", spawn.damage)));
    }
    Ok(())
}
