//! Simulation state
//!
//! Everything the loops mutate lives in one `SimulationContext`, owned by the
//! orchestrator and handed to each handler by exclusive reference.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyHandle, BodySpec, BodyState, BodyTag, Material};
use super::terrain::PendingPath;
use super::world::{PhysicsBackend, World};
use crate::ai::StrategyEngine;
use crate::consts::{AIR_SPEED, SCORING_SPEED};
use crate::normalize_angle;
use crate::settings::SimSettings;

/// Who is steering the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// The user draws terrain
    Manual,
    /// The strategy engine places terrain and pushes the agent
    Ai,
}

impl ControlMode {
    pub fn toggled(self) -> Self {
        match self {
            ControlMode::Manual => ControlMode::Ai,
            ControlMode::Ai => ControlMode::Manual,
        }
    }
}

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimPhase {
    /// World not built yet (or torn down)
    Idle,
    Running(ControlMode),
    /// Hard reset in progress; returns to `Running` in the same mode
    Resetting(ControlMode),
}

impl SimPhase {
    pub fn mode(self) -> Option<ControlMode> {
        match self {
            SimPhase::Idle => None,
            SimPhase::Running(mode) | SimPhase::Resetting(mode) => Some(mode),
        }
    }
}

/// Agent motion and scoring bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    /// Never decreases except on a hard reset
    pub cumulative_score: f32,
    pub flips: u32,
    /// Milliseconds since the agent last touched terrain
    pub air_time: f32,
    pub grounded: bool,
    /// Rotation accumulated in the current airborne stretch
    #[serde(skip)]
    spin: f32,
}

impl AgentState {
    pub fn new(spawn: Vec2) -> Self {
        Self {
            position: spawn,
            velocity: Vec2::ZERO,
            angle: 0.0,
            cumulative_score: 0.0,
            flips: 0,
            air_time: 0.0,
            grounded: true,
            spin: 0.0,
        }
    }

    /// Respawn after leaving the world; the score survives
    pub fn soft_reset(&mut self, spawn: Vec2) {
        let score = self.cumulative_score;
        *self = Self::new(spawn);
        self.cumulative_score = score;
    }

    /// Respawn and wipe the score
    pub fn hard_reset(&mut self, spawn: Vec2) {
        *self = Self::new(spawn);
    }

    /// Fold one physics step's result into the bookkeeping
    pub fn observe(&mut self, body: &BodyState, touching: bool, dt_ms: f32) {
        let turned = normalize_angle(body.angle - self.angle);
        self.position = body.position;
        self.velocity = body.velocity;
        self.angle = body.angle;
        self.grounded = touching;

        if touching {
            self.air_time = 0.0;
            self.spin = 0.0;
        } else {
            self.air_time += dt_ms;
            self.spin += turned;
            while self.spin.abs() >= TAU {
                self.flips += 1;
                self.spin -= TAU.copysign(self.spin);
            }
        }

        if self.velocity.length() > SCORING_SPEED {
            self.cumulative_score += 1.0;
        }
    }

    /// Vertical motion counts as air time for fitness
    pub fn is_airborne(&self) -> bool {
        self.velocity.y.abs() > AIR_SPEED
    }
}

/// Shared mutable state of one simulation
#[derive(Debug)]
pub struct SimulationContext<B: PhysicsBackend = World> {
    pub settings: SimSettings,
    pub world: B,
    /// `None` until the world is built
    pub agent: Option<BodyHandle>,
    pub ground: Option<BodyHandle>,
    /// Authored terrain (freehand and AI), removed in bulk on hard reset
    pub terrain: Vec<BodyHandle>,
    pub pending: PendingPath,
    pub agent_state: AgentState,
    pub engine: StrategyEngine,
}

impl<B: PhysicsBackend> SimulationContext<B> {
    pub fn new(settings: SimSettings, world: B, engine: StrategyEngine) -> Self {
        let agent_state = AgentState::new(settings.spawn);
        Self {
            settings,
            world,
            agent: None,
            ground: None,
            terrain: Vec::new(),
            pending: PendingPath::new(),
            agent_state,
            engine,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.agent.is_some()
    }

    /// Create the starting ground and the agent
    pub fn build(&mut self) {
        if self.is_ready() {
            return;
        }
        let s = &self.settings;
        let ground = BodySpec::static_rect(
            s.ground_center(),
            s.ground_width,
            s.ground_height,
            0.0,
            Material::default(),
            BodyTag::Ground,
        );
        let agent = BodySpec::dynamic_circle(
            s.spawn,
            s.agent_radius,
            Material {
                friction: s.agent_friction,
                restitution: s.agent_restitution,
                ..Material::default()
            },
            BodyTag::Agent,
        );
        self.ground = Some(self.world.add_body(ground));
        self.agent = Some(self.world.add_body(agent));
        self.agent_state = AgentState::new(self.settings.spawn);
    }

    /// Remove every body this context created
    pub fn teardown(&mut self) {
        self.clear_terrain();
        for handle in [self.agent.take(), self.ground.take()].into_iter().flatten() {
            self.world.remove_body(handle);
        }
        self.pending.clear();
    }

    /// Add one authored terrain segment
    pub fn add_terrain(&mut self, spec: BodySpec) -> BodyHandle {
        let handle = self.world.add_body(spec);
        self.terrain.push(handle);
        handle
    }

    pub fn clear_terrain(&mut self) {
        for handle in self.terrain.drain(..) {
            self.world.remove_body(handle);
        }
    }

    /// Teleport the agent to spawn. The body keeps its orientation, so the
    /// bookkeeping starts from that angle rather than zero.
    fn respawn_agent(&mut self) {
        let Some(agent) = self.agent else {
            return;
        };
        self.world
            .set_body_state(agent, self.settings.spawn, Vec2::ZERO, 0.0);
        if let Some(body) = self.world.query_body(agent) {
            self.agent_state.angle = body.angle;
        }
    }

    /// Put the agent back at spawn, keeping its score
    pub fn soft_reset(&mut self) {
        self.agent_state.soft_reset(self.settings.spawn);
        self.respawn_agent();
        log::debug!(
            "Agent left the world; respawned with score {}",
            self.agent_state.cumulative_score
        );
    }

    /// Clear authored terrain and the pending path, respawn, zero the score
    pub fn hard_reset(&mut self) {
        let removed = self.terrain.len();
        self.clear_terrain();
        self.pending.clear();
        self.agent_state.hard_reset(self.settings.spawn);
        self.respawn_agent();
        log::debug!("Hard reset removed {} terrain bodies", removed);
    }
}
