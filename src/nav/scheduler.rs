//! Amortized path scheduling
//!
//! Each tick only the agents in the active pathing bucket may compute a path.
//! Slot bookkeeping against the shared [`QueryPool`] runs sequentially; the
//! queries themselves run in parallel since each writes only its own agent.

use glam::Vec3;
use serde::Serialize;

use crate::agent::state::{Agent, BehaviorState, PathStatus};
use crate::agent::store::AgentStore;
use crate::core::config::SimulationConfig;
use crate::core::error::NavError;
use crate::core::types::Tick;
use crate::nav::pool::QueryPool;
use crate::nav::query::NavMeshQuery;
use crate::simulation::parallel;

/// Result of servicing one path request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// Waypoints now hold a path from the nav surface
    Computed,
    /// Search failed or was degenerate; the agent heads straight for its destination
    DirectLine(Option<NavError>),
    /// Start or destination could not be placed on the nav surface
    InvalidMapPosition,
}

/// Per-tick counters of the pathing phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathPhaseStats {
    pub processed: usize,
    pub computed: usize,
    pub fallbacks: usize,
    pub invalid_map_positions: usize,
    pub pool_exhausted: usize,
    pub slots_released: usize,
}

#[derive(Debug, Clone)]
pub struct PathScheduler {
    pool: QueryPool,
}

impl PathScheduler {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            pool: QueryPool::new(config.max_path_queries),
        }
    }

    pub fn pool(&self) -> &QueryPool {
        &self.pool
    }

    /// Return a destroyed agent's slot
    pub fn release_for(&mut self, agent: &mut Agent) {
        if let Some(slot) = agent.path.slot.take() {
            self.pool.release(slot);
        }
    }

    /// Run the whole pathing phase for `bucket`
    pub fn run(
        &mut self,
        agents: &mut AgentStore,
        navmesh: &dyn NavMeshQuery,
        bucket: u32,
        tick: Tick,
        config: &SimulationConfig,
    ) -> PathPhaseStats {
        let mut stats = self.admit(agents, bucket, tick, config);

        let live = agents.len();
        let outcomes = parallel::filter_map_living(agents.slots_mut(), live, config, |agent| {
            let due = agent.buckets.pathing == bucket && agent.path.needs_path && agent.path.slot.is_some();
            due.then(|| service_request(agent, navmesh, config))
        });

        for outcome in outcomes {
            stats.processed += 1;
            match outcome {
                PathOutcome::Computed => stats.computed += 1,
                PathOutcome::DirectLine(_) => stats.fallbacks += 1,
                PathOutcome::InvalidMapPosition => stats.invalid_map_positions += 1,
            }
        }
        stats
    }

    /// Sequential slot bookkeeping: admit due requests, release idle holders
    fn admit(
        &mut self,
        agents: &mut AgentStore,
        bucket: u32,
        tick: Tick,
        config: &SimulationConfig,
    ) -> PathPhaseStats {
        let mut stats = PathPhaseStats::default();
        for agent in agents.iter_mut().filter(|a| a.is_alive()) {
            let idle_for = tick.saturating_sub(agent.idle_since);
            if agent.path.slot.is_some()
                && agent.state == BehaviorState::Idle
                && !agent.path.needs_path
                && idle_for >= config.path_slot_idle_release_ticks
            {
                self.release_for(agent);
                stats.slots_released += 1;
                continue;
            }

            if agent.buckets.pathing != bucket || !agent.path.needs_path || agent.path.slot.is_some() {
                continue;
            }
            match self.pool.allocate() {
                Ok(slot) => agent.path.slot = Some(slot),
                // Request stays pending; the agent heads straight for its
                // destination until a slot frees up
                Err(_) => stats.pool_exhausted += 1,
            }
        }
        if stats.pool_exhausted > 0 {
            tracing::warn!(
                starved = stats.pool_exhausted,
                capacity = self.pool.capacity(),
                "{}",
                NavError::QueryPoolExhausted
            );
        }
        stats
    }
}

/// Compute a path for one agent and write the result into its waypoint buffer.
///
/// Always clears `needs_path`, so a failing agent is not retried every
/// bucket cycle.
pub fn service_request(agent: &mut Agent, navmesh: &dyn NavMeshQuery, config: &SimulationConfig) -> PathOutcome {
    agent.path.needs_path = false;
    let extents = Vec3::from(config.map_extents);
    let destination = agent.destination;

    let (Some(from), Some(to)) = (
        navmesh.map_location(agent.position, extents),
        navmesh.map_location(destination, extents),
    ) else {
        tracing::debug!(
            agent = %agent.id,
            position = ?agent.position,
            destination = ?destination,
            "path endpoint off the navigation surface"
        );
        agent.path.status = PathStatus::Failed;
        return PathOutcome::InvalidMapPosition;
    };

    let mut corridor = Vec::new();
    let mut points = Vec::new();
    let result = navmesh
        .find_corridor(from, to, config.path_max_iterations, &mut corridor)
        .and_then(|()| navmesh.straight_path(from.position, to.position, &corridor, &mut points));

    match result {
        Ok(()) if !is_degenerate(&points) => {
            agent.path.waypoints.replace(points);
            agent.path.status = PathStatus::Computed;
            PathOutcome::Computed
        }
        Ok(()) => {
            direct_line(agent, destination);
            PathOutcome::DirectLine(None)
        }
        Err(err) => {
            tracing::debug!(agent = %agent.id, error = %err, "path search failed, using direct line");
            direct_line(agent, destination);
            PathOutcome::DirectLine(Some(err))
        }
    }
}

fn direct_line(agent: &mut Agent, destination: Vec3) {
    agent.path.waypoints.replace([destination]);
    agent.path.status = PathStatus::DirectLine;
}

/// Empty, or every point in the same place
fn is_degenerate(points: &[Vec3]) -> bool {
    match points.first() {
        None => true,
        Some(first) => points.iter().all(|p| p.distance_squared(*first) < 1e-8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{AgentSpawn, Buckets};
    use crate::core::types::TeamId;
    use crate::nav::grid::NavGrid;
    use crate::nav::query::{NavLocation, PolyId};
    use glam::Vec2;

    /// Surface that answers every query with a fixed error
    struct Broken(NavError);

    impl NavMeshQuery for Broken {
        fn map_location(&self, position: Vec3, _extents: Vec3) -> Option<NavLocation> {
            Some(NavLocation { poly: 0, position })
        }

        fn find_corridor(&self, _: NavLocation, _: NavLocation, _: u32, _: &mut Vec<PolyId>) -> Result<(), NavError> {
            Err(self.0)
        }

        fn straight_path(&self, _: Vec3, _: Vec3, _: &[PolyId], _: &mut Vec<Vec3>) -> Result<(), NavError> {
            Err(self.0)
        }
    }

    fn agent_at(store: &mut AgentStore, position: Vec3, destination: Vec3, pathing: u32) -> crate::core::types::AgentId {
        let spawn = AgentSpawn::new(TeamId(0), position);
        let buckets = Buckets { targeting: 0, pathing };
        let id = store.insert_with(|id| Agent::from_spawn(id, &spawn, buckets, 1, 0));
        let agent = store.get_mut(id).unwrap();
        agent.destination = destination;
        agent.state = BehaviorState::Move;
        agent.path.request_repath();
        id
    }

    #[test]
    fn test_computes_path_on_open_grid() {
        let grid = NavGrid::centered(100, 100, 1.0);
        let config = SimulationConfig::default();
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        let id = agent_at(&mut store, Vec3::ZERO, Vec3::new(50.0 - 0.5, 0.0, 0.0), 0);

        let stats = scheduler.run(&mut store, &grid, 0, 0, &config);
        assert_eq!(stats.computed, 1);
        let agent = store.get(id).unwrap();
        assert!(!agent.path.needs_path);
        assert_eq!(agent.path.status, PathStatus::Computed);
        assert!(!agent.path.waypoints.is_empty());
        assert_eq!(scheduler.pool().outstanding(), 1);
    }

    #[test]
    fn test_only_active_bucket_is_serviced() {
        let grid = NavGrid::centered(20, 20, 1.0);
        let config = SimulationConfig::default();
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        let id = agent_at(&mut store, Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 3);

        let stats = scheduler.run(&mut store, &grid, 2, 0, &config);
        assert_eq!(stats.processed, 0);
        assert!(store.get(id).unwrap().path.needs_path);
        assert_eq!(scheduler.pool().outstanding(), 0);

        scheduler.run(&mut store, &grid, 3, 1, &config);
        assert!(!store.get(id).unwrap().path.needs_path);
    }

    #[test]
    fn test_search_failure_falls_back_to_destination() {
        let config = SimulationConfig::default();
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        let dest = Vec3::new(8.0, 0.0, 3.0);
        let id = agent_at(&mut store, Vec3::ZERO, dest, 0);

        let stats = scheduler.run(&mut store, &Broken(NavError::Unreachable), 0, 0, &config);
        assert_eq!(stats.fallbacks, 1);
        let agent = store.get(id).unwrap();
        assert_eq!(agent.path.status, PathStatus::DirectLine);
        assert_eq!(agent.path.waypoints.points(), &[dest]);
        assert!(!agent.path.needs_path);
    }

    #[test]
    fn test_invalid_endpoint_leaves_waypoints_alone() {
        let grid = NavGrid::new(10, 10, 1.0, Vec2::ZERO);
        let config = SimulationConfig::default();
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        let id = agent_at(&mut store, Vec3::new(1.0, 0.0, 1.0), Vec3::new(500.0, 0.0, 0.0), 0);
        store.get_mut(id).unwrap().path.waypoints.replace([Vec3::ONE, Vec3::X]);

        let stats = scheduler.run(&mut store, &grid, 0, 0, &config);
        assert_eq!(stats.invalid_map_positions, 1);
        let agent = store.get(id).unwrap();
        assert_eq!(agent.path.status, PathStatus::Failed);
        assert_eq!(agent.path.waypoints.len(), 2);
        assert!(!agent.path.needs_path, "not retried until the destination changes");
    }

    #[test]
    fn test_pool_exhaustion_keeps_request_pending() {
        let grid = NavGrid::centered(20, 20, 1.0);
        let config = SimulationConfig {
            max_path_queries: 1,
            ..Default::default()
        };
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        let a = agent_at(&mut store, Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0);
        let b = agent_at(&mut store, Vec3::new(1.0, 0.0, 1.0), Vec3::new(5.0, 0.0, 5.0), 0);

        let stats = scheduler.run(&mut store, &grid, 0, 0, &config);
        assert_eq!(stats.pool_exhausted, 1);
        assert_eq!(stats.computed, 1);
        assert!(store.get(a).unwrap().path.slot.is_some());
        assert!(store.get(b).unwrap().path.slot.is_none());
        assert!(store.get(b).unwrap().path.needs_path);
        assert!(scheduler.pool().outstanding() <= scheduler.pool().capacity());
    }

    #[test]
    fn test_starved_agents_are_counted_per_tick() {
        let grid = NavGrid::centered(20, 20, 1.0);
        let config = SimulationConfig {
            max_path_queries: 1,
            ..Default::default()
        };
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        for i in 0..5 {
            let x = i as f32 - 2.0;
            agent_at(&mut store, Vec3::new(x, 0.0, 0.0), Vec3::new(x, 0.0, 6.0), 0);
        }

        let stats = scheduler.run(&mut store, &grid, 0, 0, &config);
        assert_eq!(stats.pool_exhausted, 4);
        let stats = scheduler.run(&mut store, &grid, 0, 1, &config);
        assert_eq!(stats.pool_exhausted, 4, "still starved on the next pass");
        assert_eq!(scheduler.pool().outstanding(), 1);
    }

    #[test]
    fn test_idle_agents_give_slots_back() {
        let grid = NavGrid::centered(20, 20, 1.0);
        let config = SimulationConfig {
            path_slot_idle_release_ticks: 10,
            ..Default::default()
        };
        let mut scheduler = PathScheduler::new(&config);
        let mut store = AgentStore::new();
        let id = agent_at(&mut store, Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0);
        scheduler.run(&mut store, &grid, 0, 0, &config);
        assert_eq!(scheduler.pool().outstanding(), 1);

        {
            let agent = store.get_mut(id).unwrap();
            agent.state = BehaviorState::Idle;
            agent.idle_since = 5;
        }
        let stats = scheduler.run(&mut store, &grid, 1, 14, &config);
        assert_eq!(stats.slots_released, 0);
        let stats = scheduler.run(&mut store, &grid, 1, 15, &config);
        assert_eq!(stats.slots_released, 1);
        assert_eq!(scheduler.pool().outstanding(), 0);
        assert!(store.get(id).unwrap().path.slot.is_none());
    }
}
