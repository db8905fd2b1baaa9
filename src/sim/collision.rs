//! Collision detection and response between the agent and terrain
//!
//! The agent is a circle; every terrain piece is an oriented rectangle.
//! Detection happens in the rectangle's local frame, response in world space.

use glam::Vec2;

use crate::rotate;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the rectangle surface (if hit)
    pub point: Vec2,
    /// Surface normal at the contact, pointing toward the circle center
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between a circle and an oriented rectangle
///
/// `half` holds the rectangle's half width and half height; `angle` is its
/// rotation about `box_center`.
pub fn circle_box_collision(
    center: Vec2,
    radius: f32,
    box_center: Vec2,
    half: Vec2,
    angle: f32,
) -> CollisionResult {
    let local = rotate(center - box_center, -angle);
    let closest = local.clamp(-half, half);
    let inside = closest == local;

    let (local_point, local_normal, penetration) = if inside {
        // Center is inside the box: push out through the nearest face
        let dx = half.x - local.x.abs();
        let dy = half.y - local.y.abs();
        if dx < dy {
            let sign = if local.x < 0.0 { -1.0 } else { 1.0 };
            (
                Vec2::new(half.x * sign, local.y),
                Vec2::new(sign, 0.0),
                dx + radius,
            )
        } else {
            let sign = if local.y < 0.0 { -1.0 } else { 1.0 };
            (
                Vec2::new(local.x, half.y * sign),
                Vec2::new(0.0, sign),
                dy + radius,
            )
        }
    } else {
        let delta = local - closest;
        let dist = delta.length();
        if dist >= radius || dist <= f32::EPSILON {
            return CollisionResult::miss();
        }
        (closest, delta / dist, radius - dist)
    };

    CollisionResult {
        hit: true,
        point: box_center + rotate(local_point, angle),
        normal: rotate(local_normal, angle),
        penetration,
    }
}

/// Resolve a contact against an immovable surface.
///
/// Returns the new velocity: the normal component is reflected with
/// `restitution`, the tangential component loses at most `friction` times
/// the normal impulse (Coulomb friction).
pub fn resolve_velocity(vel: Vec2, normal: Vec2, restitution: f32, friction: f32) -> Vec2 {
    let vn = vel.dot(normal);
    if vn >= 0.0 {
        // Already separating
        return vel;
    }
    let normal_vel = normal * vn;
    let tangent_vel = vel - normal_vel;
    // Slow impacts come to rest instead of jittering
    let bounce = if -vn < 1.0 { 0.0 } else { restitution };
    let impulse = -vn * (1.0 + bounce);
    let slide = tangent_vel.length();
    let drop = (friction.max(0.0) * impulse).min(slide);
    tangent_vel - tangent_vel.normalize_or_zero() * drop - normal_vel * bounce
}
