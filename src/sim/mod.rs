//! Simulation module
//!
//! Everything that moves lives here:
//! - `world`: the physics backend seam and the built-in rigid-body world
//! - `terrain`: freehand strokes and AI actions turned into static bodies
//! - `schedule`: virtual clock, periodic AI timers and the event queue
//! - `tick`: the orchestrator running the physics, decision and generation loops
//!
//! No rendering or platform dependencies. Randomness comes only from the
//! strategy engine's seeded RNG, and bodies iterate in handle order.

pub mod body;
pub mod collision;
pub mod schedule;
pub mod state;
pub mod terrain;
pub mod tick;
pub mod world;

pub use body::{BodyHandle, BodySpec, BodyState, BodyTag, BodyView, Material, Shape};
pub use collision::{CollisionResult, circle_box_collision};
pub use schedule::{PeriodicTask, Scheduler, SimEvent};
pub use state::{AgentState, ControlMode, SimPhase, SimulationContext};
pub use terrain::{PendingPath, from_action, from_freehand_path};
pub use tick::{GestureEvent, Simulation};
pub use world::{PhysicsBackend, World};
