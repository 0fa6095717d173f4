//! Per-agent simulation state
//!
//! An agent is owned by the simulation's slot table and mutated only by the
//! phase currently running. Cross-agent effects never write here directly;
//! they go through the command queue.

use arrayvec::ArrayVec;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, TeamId, Tick};
use crate::nav::pool::QuerySlot;

/// Waypoints kept per agent; longer paths are truncated and re-requested
pub const WAYPOINT_CAPACITY: usize = 32;

/// Behavior state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    #[default]
    Idle,
    Move,
    Chase,
    Attack,
}

/// Whether the agent still takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vitality {
    #[default]
    Alive,
    /// Hit points reached zero; destroyed once the grace period has passed
    Dead { since: Tick },
}

/// Kinematic state on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Velocity chosen by the avoidance solver this tick
    pub velocity: Vec2,
    /// Velocity the agent would take with no neighbors
    pub preferred_velocity: Vec2,
    pub max_speed: f32,
    /// Collision radius, always > 0
    pub radius: f32,
}

/// Melee/ranged attack parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackProfile {
    pub range_sq: f32,
    pub damage: i32,
    pub cooldown_ticks: u64,
    pub last_attack: Option<Tick>,
}

impl AttackProfile {
    pub fn is_ready(&self, now: Tick) -> bool {
        match self.last_attack {
            None => true,
            Some(last) => now >= last + self.cooldown_ticks,
        }
    }
}

/// Current enemy target as written by target acquisition or a player order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetLock {
    pub target: Option<AgentId>,
    /// Squared ground distance at the time the lock was written
    pub dist_sq: f32,
    /// Player-issued: acquisition keeps it while the target lives
    pub forced: bool,
}

impl TargetLock {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Bucket assignment, fixed for the agent's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buckets {
    pub targeting: u32,
    pub pathing: u32,
}

/// Outcome of the agent's most recent path request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStatus {
    /// No path has been requested yet
    #[default]
    None,
    /// Waypoints hold a taut polyline from the nav surface
    Computed,
    /// Search failed or was degenerate; waypoints hold only the destination
    DirectLine,
    /// An endpoint was off the nav surface; prior waypoints were left alone
    Failed,
}

/// Ordered waypoints plus a cursor that only moves forward.
///
/// The buffer is replaced wholesale when a new path arrives and is never
/// edited in place, so `cursor <= len` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointBuffer {
    points: ArrayVec<Vec3, WAYPOINT_CAPACITY>,
    cursor: usize,
    truncated: bool,
}

impl WaypointBuffer {
    /// Replace the whole buffer and rewind the cursor.
    ///
    /// Points beyond capacity are dropped and the buffer is marked truncated.
    pub fn replace(&mut self, points: impl IntoIterator<Item = Vec3>) {
        self.points.clear();
        self.cursor = 0;
        self.truncated = false;
        for p in points {
            if self.points.try_push(p).is_err() {
                self.truncated = true;
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.cursor = 0;
        self.truncated = false;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn current(&self) -> Option<Vec3> {
        self.points.get(self.cursor).copied()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// True once the cursor sits on the last point
    pub fn on_final_leg(&self) -> bool {
        self.cursor + 1 >= self.points.len()
    }

    /// Step to the next waypoint; never moves past the last one
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.points.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }
}

/// Pathing state owned by the agent and driven by the path scheduler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathState {
    pub needs_path: bool,
    pub status: PathStatus,
    pub waypoints: WaypointBuffer,
    /// Query pool slot held while the agent may still need paths
    pub slot: Option<QuerySlot>,
}

impl PathState {
    /// Ask the scheduler for a fresh path on the agent's next pathing bucket.
    ///
    /// The current route stops being followed immediately; steering heads
    /// straight for the destination until the new path lands.
    pub fn request_repath(&mut self) {
        self.needs_path = true;
        self.status = PathStatus::None;
    }

    /// Forget any route and any pending request
    pub fn reset(&mut self) {
        self.needs_path = false;
        self.status = PathStatus::None;
        self.waypoints.clear();
    }

    /// True when steering should follow the waypoint buffer
    pub fn has_route(&self) -> bool {
        self.status == PathStatus::Computed && !self.waypoints.is_empty()
    }
}

/// Parameters for creating an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSpawn {
    pub team: TeamId,
    pub position: Vec3,
    pub max_speed: f32,
    pub radius: f32,
    pub hit_points: i32,
    pub damage: i32,
    pub attack_range: f32,
    /// Seconds between attacks
    pub attack_rate: f32,
    pub vision_range: f32,
}

impl Default for AgentSpawn {
    fn default() -> Self {
        Self {
            team: TeamId(0),
            position: Vec3::ZERO,
            max_speed: 10.0,
            radius: 0.5,
            hit_points: 10,
            damage: 10,
            attack_range: 2.0,
            attack_rate: 0.5,
            vision_range: 10.0,
        }
    }
}

impl AgentSpawn {
    pub fn new(team: TeamId, position: Vec3) -> Self {
        Self {
            team,
            position,
            ..Default::default()
        }
    }
}

/// A simulated agent
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub team: TeamId,
    pub position: Vec3,
    /// Unit facing on the ground plane
    pub heading: Vec2,
    pub motion: Motion,
    pub hit_points: i32,
    pub vitality: Vitality,
    pub state: BehaviorState,
    pub destination: Vec3,
    pub attack: AttackProfile,
    pub vision_range: f32,
    pub target: TargetLock,
    pub path: PathState,
    pub buckets: Buckets,
    /// Tick at which the agent last entered Idle
    pub idle_since: Tick,
}

impl Agent {
    /// Build an agent in the Idle state with no path slot
    pub fn from_spawn(
        id: AgentId,
        spawn: &AgentSpawn,
        buckets: Buckets,
        cooldown_ticks: u64,
        now: Tick,
    ) -> Self {
        Self {
            id,
            team: spawn.team,
            position: spawn.position,
            heading: Vec2::Y,
            motion: Motion {
                velocity: Vec2::ZERO,
                preferred_velocity: Vec2::ZERO,
                max_speed: spawn.max_speed,
                radius: spawn.radius,
            },
            hit_points: spawn.hit_points,
            vitality: Vitality::Alive,
            state: BehaviorState::Idle,
            destination: spawn.position,
            attack: AttackProfile {
                range_sq: spawn.attack_range * spawn.attack_range,
                damage: spawn.damage,
                cooldown_ticks,
                last_attack: None,
            },
            vision_range: spawn.vision_range,
            target: TargetLock::default(),
            path: PathState::default(),
            buckets,
            idle_since: now,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.vitality == Vitality::Alive
    }

    pub fn vision_range_sq(&self) -> f32 {
        self.vision_range * self.vision_range
    }
}
