//! Fixed-size pool of path query slots
//!
//! The pool is the hard bound on how many agents may hold a path query at
//! once. It is only touched from the sequential part of the pathing phase.

use serde::Serialize;

use crate::core::error::NavError;

/// Handle to an allocated query slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuerySlot(u32);

impl QuerySlot {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct QueryPool {
    in_use: Vec<bool>,
    /// Free slot indices; popped from the back so low indices go first
    free: Vec<u32>,
    outstanding: usize,
}

impl QueryPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            in_use: vec![false; capacity],
            free: (0..capacity as u32).rev().collect(),
            outstanding: 0,
        }
    }

    pub fn allocate(&mut self) -> Result<QuerySlot, NavError> {
        match self.free.pop() {
            Some(index) => {
                self.in_use[index as usize] = true;
                self.outstanding += 1;
                Ok(QuerySlot(index))
            }
            None => Err(NavError::QueryPoolExhausted),
        }
    }

    /// Return a slot to the pool. Releasing a slot twice is a no-op.
    pub fn release(&mut self, slot: QuerySlot) -> bool {
        match self.in_use.get_mut(slot.index()) {
            Some(used) if *used => {
                *used = false;
                self.free.push(slot.0);
                self.outstanding -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.in_use.len()
    }

    /// Slots currently handed out
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}
