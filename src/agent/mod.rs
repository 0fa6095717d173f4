//! Agents: data model and storage

pub mod state;
pub mod store;

pub use state::{
    Agent, AgentSpawn, AttackProfile, BehaviorState, Buckets, Motion, PathState, PathStatus,
    TargetLock, Vitality, WaypointBuffer, WAYPOINT_CAPACITY,
};
pub use store::{AgentStore, Slot};
