//! Deferred structural changes and cross-agent effects
//!
//! Nothing that touches another agent (damage), the agent table (despawn) or
//! player intent (orders) is applied mid-tick. Everything is queued here and
//! applied in FIFO order by the next flush, before the spatial index rebuild.

use glam::Vec3;
use serde::Serialize;

use crate::core::types::{AgentId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Command {
    /// Subtract hit points from `target`; ignored if it is already dead
    Damage {
        source: AgentId,
        target: AgentId,
        amount: i32,
    },
    /// Player move order; the destination is grounded when applied
    Move { agent: AgentId, destination: Vec3 },
    /// Player attack order
    SetTarget { agent: AgentId, target: AgentId },
    /// Remove an agent immediately at the next flush
    Despawn { agent: AgentId },
}

/// FIFO queue of pending commands
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    /// Take every queued command, leaving the queue empty
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }
}

impl Extend<Command> for CommandQueue {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.pending.extend(iter);
    }
}

/// One application of damage, reported to the [`DamageSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DamageEvent {
    pub tick: Tick,
    pub source: AgentId,
    pub target: AgentId,
    pub amount: i32,
    pub remaining_hp: i32,
    pub lethal: bool,
}

/// Receiver for damage events (presentation, replays, scoring)
pub trait DamageSink {
    fn on_damage(&mut self, event: &DamageEvent);
}

impl DamageSink for Vec<DamageEvent> {
    fn on_damage(&mut self, event: &DamageEvent) {
        self.push(*event);
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDamageSink;

impl DamageSink for NullDamageSink {
    fn on_damage(&mut self, _event: &DamageEvent) {}
}
