//! Simulation loops
//!
//! `Simulation` owns the context and the scheduler and runs the three loops:
//! a fixed-step physics loop fed by frame events, the AI decision tick, and
//! the generation tick that evolves the population and clears the world.

use glam::Vec2;

use super::schedule::{Scheduler, SimEvent};
use super::state::{AgentState, ControlMode, SimPhase, SimulationContext};
use super::terrain::{from_action, from_freehand_path};
use super::world::{PhysicsBackend, World};
use crate::ai::{Action, StrategyEngine};
use crate::renderer::{BodyShape, RenderFrame, RenderSink};
use crate::settings::SimSettings;

/// Longest frame gap fed to the physics loop (prevents spiral of death)
pub const MAX_FRAME_MS: f32 = 100.0;

/// Pointer input for freehand drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Start(Vec2),
    Sample(Vec2),
    End,
}

/// The orchestrator
#[derive(Debug)]
pub struct Simulation<B: PhysicsBackend = World> {
    phase: SimPhase,
    ctx: SimulationContext<B>,
    scheduler: Scheduler,
    /// Unsimulated time carried between frames
    accumulator: f32,
    last_frame_ms: Option<u64>,
}

impl Simulation<World> {
    /// Simulation on the built-in physics world
    pub fn new(settings: SimSettings) -> Self {
        let settings = settings.validated();
        let world = World::new(settings.gravity);
        let engine = StrategyEngine::from_seed(settings.seed);
        Self::with_backend(settings, world, engine)
    }
}

impl<B: PhysicsBackend> Simulation<B> {
    pub fn with_backend(settings: SimSettings, world: B, engine: StrategyEngine) -> Self {
        let scheduler = Scheduler::new(settings.decision_period_ms, settings.generation_interval_ms);
        Self {
            phase: SimPhase::Idle,
            ctx: SimulationContext::new(settings, world, engine),
            scheduler,
            accumulator: 0.0,
            last_frame_ms: None,
        }
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn mode(&self) -> Option<ControlMode> {
        self.phase.mode()
    }

    pub fn context(&self) -> &SimulationContext<B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimulationContext<B> {
        &mut self.ctx
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.ctx.engine
    }

    pub fn agent_state(&self) -> &AgentState {
        &self.ctx.agent_state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Build the world and start in manual mode
    pub fn start(&mut self) {
        if self.phase != SimPhase::Idle {
            return;
        }
        self.ctx.build();
        self.accumulator = 0.0;
        self.phase = SimPhase::Running(ControlMode::Manual);
        log::info!("Simulation started in manual mode");
    }

    /// Stop the AI timers and remove everything from the world
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_ai_timers();
        self.ctx.teardown();
        self.phase = SimPhase::Idle;
        log::info!("Simulation shut down");
    }

    /// Flip between manual and AI control without touching the world
    pub fn toggle_control(&mut self) {
        let SimPhase::Running(mode) = self.phase else {
            log::debug!("toggle_control ignored in {:?}", self.phase);
            return;
        };
        let mode = mode.toggled();
        self.phase = SimPhase::Running(mode);
        match mode {
            ControlMode::Ai => {
                // An unfinished stroke belongs to the user
                self.ctx.pending.clear();
                self.scheduler.arm_ai_timers();
            }
            ControlMode::Manual => self.scheduler.cancel_ai_timers(),
        }
        log::info!("Control switched to {:?}", mode);
    }

    /// User-requested hard reset; also restarts learning under AI control
    pub fn reset_game(&mut self) {
        let Some(mode) = self.ready_mode() else {
            return;
        };
        self.hard_reset(mode);
        if mode == ControlMode::Ai {
            self.ctx.engine.reset();
            self.scheduler.restart_generation();
            log::info!("Strategy population reset");
        }
    }

    /// Move the engine to its next strategy
    pub fn switch_strategy(&mut self) {
        self.ctx.engine.switch_strategy();
    }

    /// Feed a pointer event; only manual mode draws
    pub fn handle_gesture(&mut self, event: GestureEvent) {
        if self.ready_mode() != Some(ControlMode::Manual) {
            return;
        }
        match event {
            GestureEvent::Start(p) => {
                self.ctx.pending.clear();
                self.ctx.pending.push(p);
            }
            GestureEvent::Sample(p) => self.ctx.pending.push(p),
            GestureEvent::End => {
                let points = self.ctx.pending.take();
                if let Some(segments) = from_freehand_path(&points) {
                    log::debug!("Freehand stroke: {} segments", segments.len());
                    for spec in segments {
                        self.ctx.add_terrain(spec);
                    }
                }
            }
        }
    }

    /// Host entry point: move the clock to `now_ms`, post due work and a
    /// frame, then run everything queued
    pub fn advance(&mut self, now_ms: u64) {
        let dt_ms = match self.last_frame_ms {
            Some(last) => now_ms.saturating_sub(last) as f32,
            None => self.ctx.settings.frame_dt_ms,
        };
        self.last_frame_ms = Some(now_ms.max(self.last_frame_ms.unwrap_or(0)));
        self.scheduler.advance_to(now_ms);
        self.scheduler.post(SimEvent::Frame {
            dt_ms: dt_ms.min(MAX_FRAME_MS),
        });
        self.drain();
    }

    /// Run queued events to completion, one at a time
    pub fn drain(&mut self) {
        while let Some(event) = self.scheduler.next_event() {
            match event {
                SimEvent::Frame { dt_ms } => self.on_frame(dt_ms),
                SimEvent::DecisionTick => self.decision_tick(),
                SimEvent::GenerationTick => self.generation_tick(),
            }
        }
    }

    fn on_frame(&mut self, dt_ms: f32) {
        if self.ready_mode().is_none() {
            return;
        }
        let step = self.ctx.settings.frame_dt_ms;
        self.accumulator += dt_ms;
        let mut substeps = 0;
        while self.accumulator >= step && substeps < self.ctx.settings.max_substeps {
            self.physics_step(step);
            self.accumulator -= step;
            substeps += 1;
        }
    }

    /// One physics step plus off-world detection and score bookkeeping
    pub fn physics_step(&mut self, dt_ms: f32) {
        let Some(agent) = self.ctx.agent else {
            log::debug!("Physics step skipped: world not ready");
            return;
        };
        self.ctx.world.step(dt_ms);
        let Some(body) = self.ctx.world.query_body(agent) else {
            return;
        };
        if self.ctx.settings.is_off_world(body.position) {
            self.ctx.soft_reset();
        } else {
            let touching = self.ctx.world.is_touching(agent);
            self.ctx.agent_state.observe(&body, touching, dt_ms);
        }
    }

    /// Ask the engine for an action, apply it, and report fitness
    pub fn decision_tick(&mut self) {
        if self.ready_mode() != Some(ControlMode::Ai) {
            return;
        }
        let Some(agent) = self.ctx.agent else {
            return;
        };
        let Some(body) = self.ctx.world.query_body(agent) else {
            return;
        };

        match self.ctx.engine.next_action(body.position, body.velocity) {
            Some(action @ Action::Line { .. }) => {
                if let Some(spec) = from_action(&action) {
                    self.ctx.add_terrain(spec);
                }
            }
            Some(Action::Force { force, .. }) => {
                self.ctx.world.apply_force(agent, body.position, force);
            }
            None => {}
        }

        let agent_state = &self.ctx.agent_state;
        self.ctx.engine.update_score(
            agent_state.cumulative_score,
            agent_state.flips,
            agent_state.is_airborne(),
        );
    }

    /// Evolve, then clear the world for the next generation
    pub fn generation_tick(&mut self) {
        if self.ready_mode() != Some(ControlMode::Ai) {
            return;
        }
        self.ctx.engine.evolve();
        let stats = self.ctx.engine.stats();
        log::info!(
            "Generation {}: best {:.0}, avg {:.1}, mutation {:.1}%",
            stats.generation,
            stats.best_score_ever,
            stats.average_score,
            stats.mutation_rate * 100.0
        );
        self.hard_reset(ControlMode::Ai);
    }

    fn hard_reset(&mut self, mode: ControlMode) {
        self.phase = SimPhase::Resetting(mode);
        self.ctx.hard_reset();
        self.accumulator = 0.0;
        self.phase = SimPhase::Running(mode);
    }

    /// Current mode when running with a built world
    fn ready_mode(&self) -> Option<ControlMode> {
        match self.phase {
            SimPhase::Running(mode) if self.ctx.is_ready() => Some(mode),
            _ => None,
        }
    }

    /// Snapshot for the rendering sink
    pub fn render_frame(&self) -> RenderFrame {
        RenderFrame {
            time_ms: self.scheduler.now_ms(),
            mode: self.mode(),
            bodies: self
                .ctx
                .world
                .bodies()
                .into_iter()
                .map(BodyShape::from)
                .collect(),
            pending_path: self.ctx.pending.points().to_vec(),
            agent: self.ctx.agent_state.clone(),
            stats: self.ctx.engine.stats(),
        }
    }

    /// Hand the current frame to `sink`
    pub fn present(&self, sink: &mut impl RenderSink) {
        sink.present(&self.render_frame());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Population, Strategy};
    use crate::consts::{FRAME_MS, POPULATION_SIZE};
    use crate::sim::body::BodyTag;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn started(settings: SimSettings) -> Simulation {
        let mut sim = Simulation::new(settings);
        sim.start();
        sim
    }

    /// Engine whose strategies hold nothing, so every decision is synthesized
    fn empty_handed_engine() -> StrategyEngine {
        StrategyEngine::with_population(
            Pcg32::seed_from_u64(3),
            Population::from_strategies(vec![Strategy::default(); POPULATION_SIZE]),
        )
    }

    fn run_frames(sim: &mut Simulation, from_ms: u64, frames: u64) -> u64 {
        let mut now = from_ms;
        for _ in 0..frames {
            now += 17;
            sim.advance(now);
        }
        now
    }

    #[test]
    fn test_start_builds_world() {
        let mut sim = Simulation::new(SimSettings::default());
        assert_eq!(sim.phase(), SimPhase::Idle);
        sim.start();
        assert_eq!(sim.phase(), SimPhase::Running(ControlMode::Manual));
        assert_eq!(sim.context().world.len(), 2);
        assert!(sim.context().terrain.is_empty());
    }

    #[test]
    fn test_idle_skips_everything() {
        let mut sim = Simulation::new(SimSettings::default());
        sim.physics_step(16.0);
        sim.decision_tick();
        sim.generation_tick();
        sim.toggle_control();
        sim.reset_game();
        sim.advance(1_000);
        assert_eq!(sim.phase(), SimPhase::Idle);
        assert!(sim.context().world.is_empty());
        assert_eq!(sim.engine().stats().generation, 0);
    }

    #[test]
    fn test_toggle_control_arms_and_cancels_timers() {
        let mut sim = started(SimSettings::default());
        let bodies = sim.context().world.len();
        sim.toggle_control();
        assert_eq!(sim.mode(), Some(ControlMode::Ai));
        assert!(sim.scheduler().decision().is_armed());
        assert!(sim.scheduler().generation().is_armed());
        sim.toggle_control();
        assert_eq!(sim.mode(), Some(ControlMode::Manual));
        assert!(!sim.scheduler().decision().is_armed());
        assert_eq!(sim.context().world.len(), bodies);
    }

    #[test]
    fn test_agent_scores_while_falling() {
        let mut sim = started(SimSettings::default());
        run_frames(&mut sim, 0, 60);
        let agent = sim.agent_state();
        assert!(agent.cumulative_score > 0.0);
        assert!(agent.position.y > 100.0);
    }

    #[test]
    fn test_soft_reset_preserves_score() {
        let mut sim = started(SimSettings::default());
        let agent = sim.context().agent.expect("agent built");
        sim.context_mut().agent_state.cumulative_score = 50.0;
        sim.context_mut().agent_state.flips = 2;
        sim.context_mut()
            .world
            .set_body_state(agent, Vec2::new(5_000.0, 0.0), Vec2::new(9.0, 0.0), 0.0);
        sim.physics_step(16.0);

        let state = sim.agent_state();
        assert_eq!(state.cumulative_score, 50.0);
        assert_eq!(state.flips, 0);
        assert_eq!(state.position, Vec2::new(100.0, 100.0));
        let body = sim.context().world.query_body(agent).expect("agent exists");
        assert_eq!(body.position, Vec2::new(100.0, 100.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_decision_tick_places_synthesized_line() {
        let mut sim = Simulation::with_backend(
            SimSettings::default(),
            World::new(Vec2::new(0.0, 0.8)),
            empty_handed_engine(),
        );
        sim.start();
        sim.toggle_control();
        sim.advance(300);

        assert_eq!(sim.context().terrain.len(), 1);
        let handle = sim.context().terrain[0];
        assert_eq!(sim.context().world.tag(handle), Some(BodyTag::AiLine));
        assert_eq!(sim.engine().history().len(), 1);
    }

    #[test]
    fn test_manual_mode_makes_no_decisions() {
        let mut sim = Simulation::with_backend(
            SimSettings::default(),
            World::new(Vec2::new(0.0, 0.8)),
            empty_handed_engine(),
        );
        sim.start();
        sim.advance(5_000);
        assert!(sim.context().terrain.is_empty());
        assert!(sim.engine().history().is_empty());
    }

    #[test]
    fn test_generation_boundary_evolves_and_hard_resets() {
        let settings = SimSettings {
            generation_interval_ms: 900,
            ..SimSettings::default()
        };
        let mut sim = started(settings);
        sim.toggle_control();
        sim.advance(300);
        sim.advance(600);
        assert_eq!(sim.engine().history().len(), 2);
        sim.context_mut().agent_state.cumulative_score = 77.0;

        sim.advance(900);
        let stats = sim.engine().stats();
        assert_eq!(stats.generation, 1);
        assert_eq!(stats.population_size, POPULATION_SIZE);
        assert_eq!(stats.current_strategy, 0);
        assert!(sim.context().terrain.is_empty());
        assert_eq!(sim.agent_state().cumulative_score, 0.0);
        assert_eq!(sim.phase(), SimPhase::Running(ControlMode::Ai));
    }

    #[test]
    fn test_reset_game_in_ai_mode_resets_engine() {
        let mut sim = started(SimSettings::default());
        sim.toggle_control();
        sim.context_mut().engine.evolve();
        sim.context_mut().engine.switch_strategy();
        sim.advance(300);
        sim.reset_game();

        let stats = sim.engine().stats();
        assert_eq!(stats.generation, 0);
        assert_eq!(stats.best_score_ever, 0.0);
        assert_eq!(stats.current_strategy, 0);
        assert!(sim.context().terrain.is_empty());
        assert!(sim.engine().history().is_empty());
    }

    #[test]
    fn test_reset_game_in_manual_mode_keeps_engine() {
        let mut sim = started(SimSettings::default());
        sim.context_mut().engine.evolve();
        sim.handle_gesture(GestureEvent::Start(Vec2::new(0.0, 300.0)));
        sim.handle_gesture(GestureEvent::Sample(Vec2::new(100.0, 320.0)));
        sim.handle_gesture(GestureEvent::End);
        sim.context_mut().agent_state.cumulative_score = 12.0;
        sim.reset_game();

        assert_eq!(sim.engine().stats().generation, 1);
        assert!(sim.context().terrain.is_empty());
        assert_eq!(sim.agent_state().cumulative_score, 0.0);
        assert_eq!(sim.context().world.len(), 2);
    }

    #[test]
    fn test_freehand_gesture_builds_terrain() {
        let mut sim = started(SimSettings::default());
        sim.handle_gesture(GestureEvent::Start(Vec2::new(0.0, 300.0)));
        sim.handle_gesture(GestureEvent::Sample(Vec2::new(3.0, 300.0)));
        sim.handle_gesture(GestureEvent::Sample(Vec2::new(100.0, 300.0)));
        sim.handle_gesture(GestureEvent::Sample(Vec2::new(200.0, 350.0)));
        assert_eq!(sim.context().pending.len(), 3);
        assert!(sim.context().terrain.is_empty());

        sim.handle_gesture(GestureEvent::End);
        assert_eq!(sim.context().terrain.len(), 2);
        assert!(sim.context().pending.is_empty());
        assert_eq!(sim.context().world.len(), 4);
    }

    #[test]
    fn test_gestures_ignored_under_ai_control() {
        let mut sim = started(SimSettings::default());
        sim.toggle_control();
        sim.handle_gesture(GestureEvent::Start(Vec2::new(0.0, 300.0)));
        sim.handle_gesture(GestureEvent::Sample(Vec2::new(100.0, 300.0)));
        sim.handle_gesture(GestureEvent::End);
        assert!(sim.context().pending.is_empty());
        assert!(sim.context().terrain.is_empty());
    }

    #[test]
    fn test_shutdown_stops_ticks() {
        let mut sim = started(SimSettings::default());
        sim.toggle_control();
        sim.advance(200);
        sim.shutdown();
        assert_eq!(sim.phase(), SimPhase::Idle);
        assert!(!sim.scheduler().decision().is_armed());
        sim.advance(60_000);
        assert!(sim.context().world.is_empty());
        assert!(sim.engine().history().is_empty());
        assert_eq!(sim.engine().stats().generation, 0);
    }

    #[test]
    fn test_clock_jump_runs_one_tick_per_timer() {
        let mut sim = Simulation::with_backend(
            SimSettings::default(),
            World::new(Vec2::new(0.0, 0.8)),
            empty_handed_engine(),
        );
        sim.start();
        sim.toggle_control();
        sim.advance(29_999);
        assert_eq!(sim.context().terrain.len(), 1);
        assert_eq!(sim.engine().history().len(), 1);

        sim.advance(600_000);
        assert_eq!(sim.engine().stats().generation, 1);
        assert_eq!(sim.engine().history().len(), 2);
        assert!(sim.scheduler().generation().next_due_ms() > Some(600_000));
    }

    #[test]
    fn test_respawn_does_not_count_rolled_angle_as_flips() {
        let mut sim = started(SimSettings::default());
        let agent = sim.context().agent.expect("agent built");
        // Roll right along the starting ground (top at y = 660)
        sim.context_mut()
            .world
            .set_body_state(agent, Vec2::new(60.0, 645.0), Vec2::new(6.0, 0.0), 0.0);
        for _ in 0..60 {
            sim.physics_step(FRAME_MS);
        }
        let rolled = sim.context().world.query_body(agent).expect("agent exists");
        assert!(rolled.angular_velocity > 0.1);
        assert_eq!(sim.agent_state().flips, 0);

        sim.context_mut()
            .world
            .set_body_state(agent, Vec2::new(5_000.0, 0.0), Vec2::ZERO, 0.0);
        sim.physics_step(FRAME_MS);
        let body = sim.context().world.query_body(agent).expect("agent exists");
        assert_eq!(sim.agent_state().angle, body.angle);

        for _ in 0..5 {
            sim.physics_step(FRAME_MS);
        }
        assert!(!sim.agent_state().grounded);
        assert_eq!(sim.agent_state().flips, 0);
    }

    #[test]
    fn test_render_frame_snapshot() {
        let mut sim = started(SimSettings::default());
        sim.handle_gesture(GestureEvent::Start(Vec2::new(0.0, 300.0)));
        sim.handle_gesture(GestureEvent::Sample(Vec2::new(50.0, 300.0)));
        let frame = sim.render_frame();
        assert_eq!(frame.mode, Some(ControlMode::Manual));
        assert_eq!(frame.bodies.len(), 2);
        assert_eq!(frame.pending_path.len(), 2);
        assert_eq!(frame.stats.population_size, POPULATION_SIZE);
        assert!(frame.bodies.iter().any(|b| b.kind == BodyTag::Agent));
        assert!(frame.bodies.iter().all(|b| !b.vertices.is_empty()));
    }

    #[test]
    fn test_long_ai_run_keeps_invariants() {
        let settings = SimSettings {
            generation_interval_ms: 3_000,
            ..SimSettings::default()
        };
        let mut sim = started(settings);
        sim.toggle_control();
        run_frames(&mut sim, 0, 1_000);

        let stats = sim.engine().stats();
        assert!(stats.generation >= 5);
        assert_eq!(stats.population_size, POPULATION_SIZE);
        assert!(stats.mutation_rate >= 0.05 && stats.mutation_rate <= 0.3);
        assert!(sim.context().terrain.len() <= 10);
    }
}
