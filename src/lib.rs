//! Line Rider AI - a rolling agent, a drawable world, and a genetic algorithm
//! that learns where to put terrain.
//!
//! Core modules:
//! - `ai`: Strategy population, action selection and evolution
//! - `sim`: Rigid-body world, terrain authoring and the simulation loops
//! - `renderer`: Frame snapshots handed to an external rendering sink
//! - `settings`: Data-driven simulation parameters

pub mod ai;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use ai::{Action, PopulationStats, Strategy, StrategyEngine};
pub use settings::SimSettings;
pub use sim::{ControlMode, GestureEvent, Simulation, SimPhase};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    use std::f32::consts::PI;

    /// Reference frame length (60 Hz). Velocities are measured in pixels per reference frame.
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Matter-style gravity scale applied to the gravity vector
    pub const GRAVITY_SCALE: f32 = 0.001;
    /// Default body density (mass per square pixel)
    pub const DEFAULT_DENSITY: f32 = 0.001;

    /// Strategies per population
    pub const POPULATION_SIZE: usize = 10;
    /// Actions generated for every fresh strategy
    pub const ACTIONS_PER_STRATEGY: usize = 10;
    /// Actions appended by mutation growth
    pub const GROWTH_ACTIONS: usize = 2;
    /// Fitness samples kept for mutation-rate adaptation
    pub const HISTORY_CAPACITY: usize = 100;
    /// Samples in each averaging window of the adaptation step
    pub const TREND_WINDOW: usize = 10;

    pub const INITIAL_MUTATION_RATE: f32 = 0.1;
    pub const MIN_MUTATION_RATE: f32 = 0.05;
    pub const MAX_MUTATION_RATE: f32 = 0.3;
    /// Probability a refill child comes from crossover rather than mutation
    pub const CROSSOVER_PROBABILITY: f64 = 0.7;
    /// Probability a random action is a line rather than a force
    pub const LINE_PROBABILITY: f64 = 0.7;

    /// Reachable window for stored actions (exclusive on both ends)
    pub const ACTION_MIN_DISTANCE: f32 = 50.0;
    pub const ACTION_MAX_DISTANCE: f32 = 150.0;
    /// Frames of look-ahead used when synthesizing an action
    pub const LOOK_AHEAD_FRAMES: f32 = 20.0;
    /// Speed above which a ramp is synthesized instead of a boost platform
    pub const RAMP_SPEED: f32 = 3.0;
    pub const RAMP_ANGLE: f32 = -PI / 6.0;
    pub const BOOST_ANGLE: f32 = -PI / 12.0;

    /// Fitness weights
    pub const FLIP_BONUS: f32 = 50.0;
    pub const AIR_BONUS: f32 = 10.0;

    /// Mutation noise half-widths
    pub const LINE_JITTER: f32 = 25.0;
    pub const ANGLE_JITTER: f32 = 0.25;
    pub const FORCE_JITTER: f32 = 0.0025;

    /// AI-placed line size
    pub const AI_LINE_WIDTH: f32 = 80.0;
    pub const LINE_THICKNESS: f32 = 8.0;

    /// Freehand segment material
    pub const FREEHAND_FRICTION: f32 = 0.8;
    pub const FREEHAND_FRICTION_STATIC: f32 = 0.9;
    pub const FREEHAND_RESTITUTION: f32 = 0.1;
    /// Segments at or below this length are dropped
    pub const MIN_SEGMENT_LENGTH: f32 = 2.0;
    /// Minimum spacing between accepted pointer samples
    pub const MIN_SAMPLE_SPACING: f32 = 8.0;

    /// Distance beyond the world edges that counts as off-world
    pub const OFF_WORLD_MARGIN: f32 = 200.0;
    /// Speed above which the agent earns score
    pub const SCORING_SPEED: f32 = 2.0;
    /// Vertical speed above which the agent counts as airborne for fitness
    pub const AIR_SPEED: f32 = 0.1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

/// Unit vector pointing along `angle`
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Rotate `v` by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    direction(angle).rotate(v)
}
