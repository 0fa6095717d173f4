//! Generation-checked slot table holding every agent
//!
//! Ids are small integers (the slot index) paired with a generation counter.
//! Destroying an agent bumps its slot's generation, so any id still held
//! elsewhere stops resolving instead of aliasing the slot's next occupant.

use crate::agent::state::Agent;
use crate::core::types::AgentId;

/// One entry of the slot table
#[derive(Debug, Clone, Default)]
pub struct Slot {
    generation: u32,
    agent: Option<Agent>,
}

impl Slot {
    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_ref()
    }

    pub fn agent_mut(&mut self) -> Option<&mut Agent> {
        self.agent.as_mut()
    }

    /// Occupant, only if it is still alive
    pub fn living_mut(&mut self) -> Option<&mut Agent> {
        self.agent.as_mut().filter(|a| a.is_alive())
    }
}

/// Dense table of agent slots with LIFO slot reuse
#[derive(Debug, Clone, Default)]
pub struct AgentStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Insert an agent built from its freshly assigned id
    pub fn insert_with(&mut self, build: impl FnOnce(AgentId) -> Agent) -> AgentId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = AgentId::new(index, slot.generation);
        slot.agent = Some(build(id));
        self.live += 1;
        id
    }

    /// Remove an agent; stale ids return `None`
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self.slots.get_mut(id.slot())?;
        if slot.generation != id.generation {
            return None;
        }
        let agent = slot.agent.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(agent)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.agent.as_ref()
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let slot = self.slots.get_mut(id.slot())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.agent.as_mut()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.get(id).is_some()
    }

    /// Number of agents currently stored (alive or awaiting destruction)
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Agents in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.slots.iter().filter_map(|s| s.agent.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> + '_ {
        self.slots.iter_mut().filter_map(|s| s.agent.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.iter().map(|a| a.id)
    }

    /// Raw slots, for chunked parallel phases
    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{AgentSpawn, Buckets};
    use crate::core::types::TeamId;
    use glam::Vec3;

    fn spawn(store: &mut AgentStore, x: f32) -> AgentId {
        let params = AgentSpawn::new(TeamId(0), Vec3::new(x, 0.0, 0.0));
        store.insert_with(|id| Agent::from_spawn(id, &params, Buckets::default(), 1, 0))
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, 1.0);
        let b = spawn(&mut store, 2.0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a).unwrap().position.x, 1.0);
        assert_eq!(store.get(b).unwrap().id, b);
    }

    #[test]
    fn test_stale_id_does_not_resolve_after_reuse() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, 1.0);
        assert!(store.remove(a).is_some());
        assert!(store.get(a).is_none());

        let b = spawn(&mut store, 2.0);
        assert_eq!(b.index, a.index, "slot is reused");
        assert_ne!(b.generation, a.generation);
        assert!(store.get(a).is_none());
        assert!(store.remove(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_iteration_is_slot_ordered() {
        let mut store = AgentStore::new();
        let ids: Vec<_> = (0..5).map(|i| spawn(&mut store, i as f32)).collect();
        store.remove(ids[2]);
        let seen: Vec<_> = store.ids().collect();
        assert_eq!(seen, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn test_out_of_range_id() {
        let store = AgentStore::new();
        assert!(store.get(AgentId::new(42, 0)).is_none());
    }
}
