//! Chunked per-agent phase execution
//!
//! Phases that only write the agent they are processing run over contiguous
//! slot ranges on the rayon pool once the live count reaches
//! `parallel_threshold`. Results are collected in slot order, so callers see
//! the same sequence either way.

use rayon::prelude::*;

use crate::agent::state::Agent;
use crate::agent::store::Slot;
use crate::core::config::SimulationConfig;

/// Apply `f` to every living agent; collect the `Some` results in slot order
pub fn filter_map_living<R, F>(slots: &mut [Slot], live: usize, config: &SimulationConfig, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(&mut Agent) -> Option<R> + Sync + Send,
{
    if live < config.parallel_threshold {
        return slots.iter_mut().filter_map(Slot::living_mut).filter_map(&f).collect();
    }

    // PARALLEL: each chunk owns a disjoint slot range
    slots
        .par_chunks_mut(config.parallel_chunk_size.max(1))
        .flat_map_iter(|chunk| {
            chunk
                .iter_mut()
                .filter_map(Slot::living_mut)
                .filter_map(&f)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Apply `f` to every living agent
pub fn for_each_living<F>(slots: &mut [Slot], live: usize, config: &SimulationConfig, f: F)
where
    F: Fn(&mut Agent) + Sync + Send,
{
    if live < config.parallel_threshold {
        slots.iter_mut().filter_map(Slot::living_mut).for_each(&f);
        return;
    }

    slots
        .par_chunks_mut(config.parallel_chunk_size.max(1))
        .for_each(|chunk| chunk.iter_mut().filter_map(Slot::living_mut).for_each(&f));
}

/// Count living agents for which `f` returns true
pub fn count_living<F>(slots: &mut [Slot], live: usize, config: &SimulationConfig, f: F) -> usize
where
    F: Fn(&mut Agent) -> bool + Sync + Send,
{
    filter_map_living(slots, live, config, |agent| f(agent).then_some(())).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{AgentSpawn, Buckets, Vitality};
    use crate::agent::store::AgentStore;
    use crate::core::types::{AgentId, TeamId};
    use glam::Vec3;

    fn store(n: usize) -> AgentStore {
        let mut store = AgentStore::new();
        for i in 0..n {
            let spawn = AgentSpawn::new(TeamId(0), Vec3::new(i as f32, 0.0, 0.0));
            store.insert_with(|id| Agent::from_spawn(id, &spawn, Buckets::default(), 1, 0));
        }
        store
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let sequential = SimulationConfig::default();
        let parallel = SimulationConfig {
            parallel_threshold: 1,
            parallel_chunk_size: 7,
            ..Default::default()
        };

        let mut a = store(100);
        let mut b = store(100);
        let live = a.len();
        let ids_a: Vec<AgentId> = filter_map_living(a.slots_mut(), live, &sequential, |ag| Some(ag.id));
        let ids_b: Vec<AgentId> = filter_map_living(b.slots_mut(), live, &parallel, |ag| Some(ag.id));
        assert_eq!(ids_a, ids_b);
        assert_eq!(ids_a.len(), 100);
        assert!(ids_a.windows(2).all(|w| w[0].index < w[1].index));
    }

    #[test]
    fn test_dead_agents_are_skipped() {
        let config = SimulationConfig {
            parallel_threshold: 1,
            ..Default::default()
        };
        let mut s = store(10);
        let victim = s.ids().nth(3).unwrap();
        s.get_mut(victim).unwrap().vitality = Vitality::Dead { since: 0 };

        let live = s.len();
        for_each_living(s.slots_mut(), live, &config, |agent| agent.position.y = 1.0);
        assert_eq!(s.get(victim).unwrap().position.y, 0.0);
        assert_eq!(count_living(s.slots_mut(), live, &config, |agent| agent.position.y == 1.0), 9);
    }
}
