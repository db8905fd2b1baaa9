//! Rigid body descriptions and query results

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_DENSITY;
use crate::rotate;

/// Opaque handle to a body owned by a physics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Where a body came from (render colouring and bulk removal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyTag {
    Agent,
    Ground,
    Freehand,
    AiLine,
}

/// Collision shape in body-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Circle { radius: f32 },
    /// Rectangle centered on the body origin
    Rect { width: f32, height: f32 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rect { width, height } => width * height,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { width, height } => Vec2::new(width, height) * 0.5,
        }
    }
}

/// Surface response parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub friction: f32,
    /// Carried for backends with a stick threshold; the built-in `World`
    /// only applies kinetic `friction`
    pub friction_static: f32,
    pub restitution: f32,
    pub density: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.1,
            friction_static: 0.5,
            restitution: 0.0,
            density: DEFAULT_DENSITY,
        }
    }
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub shape: Shape,
    pub position: Vec2,
    pub angle: f32,
    pub is_static: bool,
    pub material: Material,
    pub tag: BodyTag,
}

impl BodySpec {
    /// Static rectangle centered at `position`
    pub fn static_rect(
        position: Vec2,
        width: f32,
        height: f32,
        angle: f32,
        material: Material,
        tag: BodyTag,
    ) -> Self {
        Self {
            shape: Shape::Rect { width, height },
            position,
            angle,
            is_static: true,
            material,
            tag,
        }
    }

    /// Dynamic circle centered at `position`
    pub fn dynamic_circle(position: Vec2, radius: f32, material: Material, tag: BodyTag) -> Self {
        Self {
            shape: Shape::Circle { radius },
            position,
            angle: 0.0,
            is_static: false,
            material,
            tag,
        }
    }

    pub fn mass(&self) -> f32 {
        self.shape.area() * self.material.density
    }

    /// World-space outline. Circles are approximated by a polygon.
    pub fn vertices(&self) -> Vec<Vec2> {
        outline(&self.shape, self.position, self.angle)
    }
}

/// Snapshot of a body's kinematic state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub angle: f32,
    pub vertices: Vec<Vec2>,
}

/// A body as seen from outside the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub handle: BodyHandle,
    pub tag: BodyTag,
    pub state: BodyState,
}

/// Polygon sides used for circle outlines
const CIRCLE_SIDES: usize = 16;

pub fn outline(shape: &Shape, position: Vec2, angle: f32) -> Vec<Vec2> {
    match *shape {
        Shape::Circle { radius } => (0..CIRCLE_SIDES)
            .map(|i| {
                let theta = angle + i as f32 / CIRCLE_SIDES as f32 * std::f32::consts::TAU;
                position + Vec2::new(theta.cos(), theta.sin()) * radius
            })
            .collect(),
        Shape::Rect { .. } => {
            let h = shape.half_extents();
            [
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ]
            .into_iter()
            .map(|corner| position + rotate(corner, angle))
            .collect()
        }
    }
}
