//! Rendering sink interface
//!
//! The simulation never draws. Once per frame the host pulls a `RenderFrame`
//! (body outlines, the stroke being drawn, agent and population statistics)
//! and hands it to whatever renders it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ai::PopulationStats;
use crate::normalize_angle;
use crate::sim::{AgentState, BodyTag, BodyView, ControlMode};

/// One body, ready to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyShape {
    pub kind: BodyTag,
    pub position: Vec2,
    /// Rotation normalized to [-π, π)
    pub angle: f32,
    /// World-space outline
    pub vertices: Vec<Vec2>,
}

impl From<BodyView> for BodyShape {
    fn from(view: BodyView) -> Self {
        Self {
            kind: view.tag,
            position: view.state.position,
            angle: normalize_angle(view.state.angle),
            vertices: view.state.vertices,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Simulation clock
    pub time_ms: u64,
    /// `None` while idle
    pub mode: Option<ControlMode>,
    pub bodies: Vec<BodyShape>,
    /// Samples of the stroke being drawn
    pub pending_path: Vec<Vec2>,
    pub agent: AgentState,
    pub stats: PopulationStats,
}

impl RenderFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Consumer of frames (canvas, GPU, log...)
pub trait RenderSink {
    fn present(&mut self, frame: &RenderFrame);
}
