//! Physics world adapter
//!
//! `PhysicsBackend` is the contract the orchestrator consumes: create bodies,
//! remove them, step, query and teleport. `World` is the built-in backend: a
//! dynamic circle rolling over static oriented rectangles, with velocities in
//! pixels per reference frame.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;

use super::body::{BodyHandle, BodySpec, BodyState, BodyTag, BodyView, Shape};
use super::collision::{circle_box_collision, resolve_velocity};
use crate::consts::{FRAME_MS, GRAVITY_SCALE};

/// Rigid-body engine contract
pub trait PhysicsBackend {
    /// Add a body; the handle stays valid until `remove_body`
    fn add_body(&mut self, spec: BodySpec) -> BodyHandle;
    /// Remove a body. Unknown handles are ignored and return `false`.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;
    /// Advance the world by `dt_ms` milliseconds
    fn step(&mut self, dt_ms: f32);
    fn query_body(&self, handle: BodyHandle) -> Option<BodyState>;
    /// Teleport a body, clearing pending forces
    fn set_body_state(
        &mut self,
        handle: BodyHandle,
        position: Vec2,
        velocity: Vec2,
        angular_velocity: f32,
    ) -> bool;
    /// Queue a force applied at world `point` during the next step
    fn apply_force(&mut self, handle: BodyHandle, point: Vec2, force: Vec2) -> bool;
    /// Whether the body touched anything during the last step
    fn is_touching(&self, handle: BodyHandle) -> bool;
    /// All bodies in handle order
    fn bodies(&self) -> Vec<BodyView>;
}

/// Velocity fraction lost to air drag per reference frame
pub const AIR_FRICTION: f32 = 0.01;

#[derive(Debug, Clone)]
struct RigidBody {
    spec: BodySpec,
    velocity: Vec2,
    angular_velocity: f32,
    force: Vec2,
    torque: f32,
    inv_mass: f32,
    inv_inertia: f32,
    touching: bool,
}

impl RigidBody {
    fn new(spec: BodySpec) -> Self {
        let (inv_mass, inv_inertia) = if spec.is_static {
            (0.0, 0.0)
        } else {
            let mass = spec.mass().max(f32::EPSILON);
            let inertia = match spec.shape {
                Shape::Circle { radius } => 0.5 * mass * radius * radius,
                Shape::Rect { width, height } => mass * (width * width + height * height) / 12.0,
            };
            (1.0 / mass, 1.0 / inertia.max(f32::EPSILON))
        };
        Self {
            spec,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            inv_mass,
            inv_inertia,
            touching: false,
        }
    }

    fn state(&self) -> BodyState {
        BodyState {
            position: self.spec.position,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
            angle: self.spec.angle,
            vertices: self.spec.vertices(),
        }
    }
}

/// Built-in rigid-body world
#[derive(Debug, Clone)]
pub struct World {
    gravity: Vec2,
    /// Sorted by handle for deterministic iteration
    bodies: BTreeMap<BodyHandle, RigidBody>,
    next_id: u32,
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    pub fn tag(&self, handle: BodyHandle) -> Option<BodyTag> {
        self.bodies.get(&handle).map(|b| b.spec.tag)
    }

    fn integrate(&mut self, dt_ms: f32) {
        let k = dt_ms / FRAME_MS;
        let gravity_step = self.gravity * GRAVITY_SCALE * FRAME_MS * FRAME_MS * k;
        let drag = (1.0 - AIR_FRICTION * k).max(0.0);

        for body in self.bodies.values_mut().filter(|b| !b.spec.is_static) {
            body.velocity += body.force * body.inv_mass * FRAME_MS * dt_ms;
            body.angular_velocity += body.torque * body.inv_inertia * FRAME_MS * dt_ms;
            body.force = Vec2::ZERO;
            body.torque = 0.0;

            body.velocity = body.velocity * drag + gravity_step;
            body.spec.position += body.velocity * k;
            body.spec.angle = (body.spec.angle + body.angular_velocity * k).rem_euclid(TAU);
            body.touching = false;
        }
    }

    fn resolve_contacts(&mut self) {
        let statics: Vec<BodySpec> = self
            .bodies
            .values()
            .filter(|b| b.spec.is_static)
            .map(|b| b.spec)
            .collect();

        for body in self.bodies.values_mut().filter(|b| !b.spec.is_static) {
            // Only circles collide; the agent is the sole dynamic body
            let Shape::Circle { radius } = body.spec.shape else {
                continue;
            };
            for terrain in &statics {
                let hit = circle_box_collision(
                    body.spec.position,
                    radius,
                    terrain.position,
                    terrain.shape.half_extents(),
                    terrain.angle,
                );
                if !hit.hit {
                    continue;
                }
                body.spec.position += hit.normal * hit.penetration;
                let restitution = body.spec.material.restitution.max(terrain.material.restitution);
                let friction = body.spec.material.friction.min(terrain.material.friction);
                body.velocity = resolve_velocity(body.velocity, hit.normal, restitution, friction);

                // Roll without slipping along the contact tangent
                let tangent = Vec2::new(hit.normal.y, -hit.normal.x);
                body.angular_velocity = -body.velocity.dot(tangent) / radius;
                body.touching = true;
            }
        }
    }
}

impl PhysicsBackend for World {
    fn add_body(&mut self, spec: BodySpec) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        self.bodies.insert(handle, RigidBody::new(spec));
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle).is_some()
    }

    fn step(&mut self, dt_ms: f32) {
        if dt_ms <= 0.0 {
            return;
        }
        self.integrate(dt_ms);
        self.resolve_contacts();
    }

    fn query_body(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&handle).map(RigidBody::state)
    }

    fn set_body_state(
        &mut self,
        handle: BodyHandle,
        position: Vec2,
        velocity: Vec2,
        angular_velocity: f32,
    ) -> bool {
        let Some(body) = self.bodies.get_mut(&handle) else {
            return false;
        };
        body.spec.position = position;
        body.velocity = velocity;
        body.angular_velocity = angular_velocity;
        body.force = Vec2::ZERO;
        body.torque = 0.0;
        true
    }

    fn apply_force(&mut self, handle: BodyHandle, point: Vec2, force: Vec2) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(body) if !body.spec.is_static => {
                body.force += force;
                body.torque += (point - body.spec.position).perp_dot(force);
                true
            }
            _ => false,
        }
    }

    fn is_touching(&self, handle: BodyHandle) -> bool {
        self.bodies.get(&handle).is_some_and(|b| b.touching)
    }

    fn bodies(&self) -> Vec<BodyView> {
        self.bodies
            .iter()
            .map(|(&handle, body)| BodyView {
                handle,
                tag: body.spec.tag,
                state: body.state(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::Material;

    fn agent_spec(pos: Vec2) -> BodySpec {
        BodySpec::dynamic_circle(
            pos,
            15.0,
            Material {
                friction: 0.1,
                restitution: 0.8,
                ..Material::default()
            },
            BodyTag::Agent,
        )
    }

    fn ground(world: &mut World, center: Vec2, angle: f32) -> BodyHandle {
        world.add_body(BodySpec::static_rect(
            center,
            400.0,
            20.0,
            angle,
            Material::default(),
            BodyTag::Ground,
        ))
    }

    #[test]
    fn test_free_fall_accelerates_down() {
        let mut world = World::new(Vec2::new(0.0, 0.8));
        let agent = world.add_body(agent_spec(Vec2::new(0.0, 0.0)));
        for _ in 0..10 {
            world.step(FRAME_MS);
        }
        let state = world.query_body(agent).expect("agent exists");
        assert!(state.velocity.y > 1.5);
        assert!(state.position.y > 5.0);
        assert!(!world.is_touching(agent));
    }

    #[test]
    fn test_agent_comes_to_rest_on_ground() {
        let mut world = World::new(Vec2::new(0.0, 0.8));
        ground(&mut world, Vec2::new(0.0, 100.0), 0.0);
        let agent = world.add_body(agent_spec(Vec2::new(0.0, 0.0)));
        for _ in 0..600 {
            world.step(FRAME_MS);
        }
        let state = world.query_body(agent).expect("agent exists");
        // Ground top at y = 90, agent radius 15
        assert!((state.position.y - 75.0).abs() < 1.0, "y = {}", state.position.y);
        assert!(state.velocity.length() < 0.5);
        assert!(world.is_touching(agent));
    }

    #[test]
    fn test_agent_rolls_down_slope() {
        let mut world = World::new(Vec2::new(0.0, 0.8));
        // Descends to the right in screen coordinates
        ground(&mut world, Vec2::new(0.0, 100.0), 0.3);
        let agent = world.add_body(agent_spec(Vec2::new(-50.0, 40.0)));
        for _ in 0..120 {
            world.step(FRAME_MS);
        }
        let state = world.query_body(agent).expect("agent exists");
        assert!(state.position.x > -40.0);
        assert!(state.velocity.x > 0.0);
        assert!(state.angular_velocity > 0.0);
    }

    #[test]
    fn test_apply_force_changes_velocity_once() {
        let mut world = World::new(Vec2::ZERO);
        let agent = world.add_body(agent_spec(Vec2::ZERO));
        assert!(world.apply_force(agent, Vec2::ZERO, Vec2::new(0.005, 0.0)));
        world.step(FRAME_MS);
        let v1 = world.query_body(agent).expect("agent exists").velocity.x;
        assert!(v1 > 1.0);
        world.step(FRAME_MS);
        let v2 = world.query_body(agent).expect("agent exists").velocity.x;
        assert!(v2 <= v1);
    }

    #[test]
    fn test_static_bodies_ignore_forces() {
        let mut world = World::new(Vec2::new(0.0, 0.8));
        let g = ground(&mut world, Vec2::new(0.0, 100.0), 0.0);
        assert!(!world.apply_force(g, Vec2::ZERO, Vec2::new(1.0, 0.0)));
        world.step(FRAME_MS);
        assert_eq!(
            world.query_body(g).expect("ground exists").position,
            Vec2::new(0.0, 100.0)
        );
    }

    #[test]
    fn test_remove_and_unknown_handles() {
        let mut world = World::new(Vec2::ZERO);
        let g = ground(&mut world, Vec2::ZERO, 0.0);
        assert_eq!(world.len(), 1);
        assert!(world.remove_body(g));
        assert!(!world.remove_body(g));
        assert!(world.query_body(g).is_none());
        assert!(!world.set_body_state(g, Vec2::ZERO, Vec2::ZERO, 0.0));
        assert!(world.is_empty());
    }

    #[test]
    fn test_set_body_state_teleports() {
        let mut world = World::new(Vec2::ZERO);
        let agent = world.add_body(agent_spec(Vec2::ZERO));
        world.set_body_state(agent, Vec2::new(100.0, 100.0), Vec2::ZERO, 0.0);
        let state = world.query_body(agent).expect("agent exists");
        assert_eq!(state.position, Vec2::new(100.0, 100.0));
        assert_eq!(state.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_spin_angle_stays_wrapped() {
        let mut world = World::new(Vec2::ZERO);
        let agent = world.add_body(agent_spec(Vec2::ZERO));
        world.set_body_state(agent, Vec2::ZERO, Vec2::ZERO, 3.0);
        for _ in 0..10_000 {
            world.step(FRAME_MS);
        }
        let angle = world.query_body(agent).expect("agent exists").angle;
        assert!((0.0..TAU).contains(&angle));
    }

    #[test]
    fn test_static_friction_does_not_affect_contacts() {
        let run = |friction_static: f32| {
            let mut world = World::new(Vec2::new(0.0, 0.8));
            world.add_body(BodySpec::static_rect(
                Vec2::new(0.0, 100.0),
                400.0,
                20.0,
                0.3,
                Material {
                    friction_static,
                    ..Material::default()
                },
                BodyTag::Freehand,
            ));
            let agent = world.add_body(agent_spec(Vec2::new(-50.0, 60.0)));
            for _ in 0..90 {
                world.step(FRAME_MS);
            }
            world.query_body(agent).expect("agent exists")
        };
        assert_eq!(run(0.0), run(0.9));
    }

    #[test]
    fn test_bodies_in_handle_order() {
        let mut world = World::new(Vec2::ZERO);
        let a = ground(&mut world, Vec2::ZERO, 0.0);
        let b = world.add_body(agent_spec(Vec2::ZERO));
        let views = world.bodies();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].handle, a);
        assert_eq!(views[1].handle, b);
        assert_eq!(views[1].tag, BodyTag::Agent);
    }
}
