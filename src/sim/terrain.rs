//! Terrain authoring
//!
//! Turns freehand pointer paths and AI line actions into static segment
//! specs ready for the physics world.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodySpec, BodyTag, Material};
use crate::ai::Action;
use crate::consts::*;

/// Material for user-drawn segments
pub fn freehand_material() -> Material {
    Material {
        friction: FREEHAND_FRICTION,
        friction_static: FREEHAND_FRICTION_STATIC,
        restitution: FREEHAND_RESTITUTION,
        density: DEFAULT_DENSITY,
    }
}

/// Build one static segment per consecutive pair of points.
///
/// Pairs whose length is at most `MIN_SEGMENT_LENGTH` are dropped. Returns
/// `None` for fewer than two points or when every pair was dropped.
pub fn from_freehand_path(points: &[Vec2]) -> Option<Vec<BodySpec>> {
    if points.len() < 2 {
        return None;
    }
    let segments: Vec<BodySpec> = points
        .windows(2)
        .filter_map(|pair| {
            let delta = pair[1] - pair[0];
            let length = delta.length();
            (length > MIN_SEGMENT_LENGTH).then(|| {
                BodySpec::static_rect(
                    (pair[0] + pair[1]) * 0.5,
                    length,
                    LINE_THICKNESS,
                    delta.y.atan2(delta.x),
                    freehand_material(),
                    BodyTag::Freehand,
                )
            })
        })
        .collect();
    (!segments.is_empty()).then_some(segments)
}

/// Fixed-size segment centered at `pos`, rotated by `angle`
pub fn line_segment(pos: Vec2, angle: f32) -> BodySpec {
    BodySpec::static_rect(
        pos,
        AI_LINE_WIDTH,
        LINE_THICKNESS,
        angle,
        Material::default(),
        BodyTag::AiLine,
    )
}

/// Segment for a `Line` action; force actions place no terrain
pub fn from_action(action: &Action) -> Option<BodySpec> {
    match *action {
        Action::Line { pos, angle } => Some(line_segment(pos, angle)),
        Action::Force { .. } => None,
    }
}

/// Samples of the freehand gesture in progress
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingPath {
    points: Vec<Vec2>,
}

impl PendingPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pointer sample. Samples closer than `MIN_SAMPLE_SPACING` to the
    /// previous one replace it instead of extending the path.
    pub fn push(&mut self, point: Vec2) {
        match self.points.last_mut() {
            Some(last) if last.distance(point) < MIN_SAMPLE_SPACING => *last = point,
            _ => self.points.push(point),
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Hand the samples over, leaving the path empty
    pub fn take(&mut self) -> Vec<Vec2> {
        std::mem::take(&mut self.points)
    }
}
