//! Simulation settings
//!
//! Loaded from a JSON file when one is given; every field falls back to its
//! default so partial files are fine.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{FRAME_MS, MAX_SUBSTEPS};

/// Tunable simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Seed for the strategy engine's RNG
    pub seed: u64,

    // === World ===
    pub world_width: f32,
    pub world_height: f32,
    /// Gravity before scaling (pixels per frame², times `GRAVITY_SCALE`)
    pub gravity: Vec2,
    /// Where the agent starts and respawns
    pub spawn: Vec2,

    // === Agent ===
    pub agent_radius: f32,
    pub agent_restitution: f32,
    pub agent_friction: f32,

    // === Starting ground ===
    pub ground_width: f32,
    pub ground_height: f32,
    /// Distance from the bottom of the world to the ground's center
    pub ground_offset: f32,

    // === Timing (milliseconds) ===
    /// Physics step length
    pub frame_dt_ms: f32,
    /// Physics steps allowed per frame callback
    pub max_substeps: u32,
    /// Period of the AI decision tick
    pub decision_period_ms: u64,
    /// Length of one generation under AI control
    pub generation_interval_ms: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            seed: 0x1f2e_3d4c,

            world_width: 1280.0,
            world_height: 720.0,
            gravity: Vec2::new(0.0, 0.8),
            spawn: Vec2::new(100.0, 100.0),

            agent_radius: 15.0,
            agent_restitution: 0.8,
            agent_friction: 0.1,

            ground_width: 400.0,
            ground_height: 20.0,
            ground_offset: 50.0,

            frame_dt_ms: FRAME_MS,
            max_substeps: MAX_SUBSTEPS,
            decision_period_ms: 300,
            generation_interval_ms: 30_000,
        }
    }
}

impl SimSettings {
    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::validated)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a file, falling back to defaults on any error
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Replace values the simulation cannot run with
    pub fn validated(mut self) -> Self {
        fn positive_or(value: f32, fallback: f32) -> f32 {
            if value > 0.0 && value.is_finite() {
                value
            } else {
                fallback
            }
        }

        let defaults = Self::default();
        self.world_width = positive_or(self.world_width, defaults.world_width);
        self.world_height = positive_or(self.world_height, defaults.world_height);
        self.agent_radius = positive_or(self.agent_radius, defaults.agent_radius);
        self.frame_dt_ms = positive_or(self.frame_dt_ms, defaults.frame_dt_ms);
        self.max_substeps = self.max_substeps.max(1);
        self.decision_period_ms = self.decision_period_ms.max(1);
        self.generation_interval_ms = self.generation_interval_ms.max(1);
        self
    }

    /// Center of the starting ground
    pub fn ground_center(&self) -> Vec2 {
        Vec2::new(self.ground_width / 2.0, self.world_height - self.ground_offset)
    }

    /// True once the agent has left the playable area
    pub fn is_off_world(&self, pos: Vec2) -> bool {
        use crate::consts::OFF_WORLD_MARGIN;
        pos.y > self.world_height + OFF_WORLD_MARGIN
            || pos.x < -OFF_WORLD_MARGIN
            || pos.x > self.world_width + OFF_WORLD_MARGIN
    }
}
