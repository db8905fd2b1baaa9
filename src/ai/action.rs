//! Actions and the strategies that carry them

use std::f32::consts::FRAC_PI_4;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// One thing the AI can do to the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Place a static terrain segment centered at `pos`, rotated by `angle`
    Line { pos: Vec2, angle: f32 },
    /// Push the agent with `force` while it is at `pos`
    Force { pos: Vec2, force: Vec2 },
}

impl Action {
    /// Anchor point used for reachability checks
    pub fn pos(&self) -> Vec2 {
        match *self {
            Action::Line { pos, .. } | Action::Force { pos, .. } => pos,
        }
    }

    /// True when the anchor lies strictly inside the reachable window around `from`
    pub fn is_reachable_from(&self, from: Vec2) -> bool {
        let dist = self.pos().distance(from);
        dist > ACTION_MIN_DISTANCE && dist < ACTION_MAX_DISTANCE
    }

    /// Apply mutation noise in place
    pub fn jitter<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self {
            Action::Line { pos, angle } => {
                pos.x += rng.random_range(-LINE_JITTER..LINE_JITTER);
                pos.y += rng.random_range(-LINE_JITTER..LINE_JITTER);
                *angle += rng.random_range(-ANGLE_JITTER..ANGLE_JITTER);
            }
            Action::Force { force, .. } => {
                force.x += rng.random_range(-FORCE_JITTER..FORCE_JITTER);
                force.y += rng.random_range(-FORCE_JITTER..FORCE_JITTER);
            }
        }
    }

    /// Action synthesized from motion when nothing stored is reachable:
    /// a ramp when fast, a boost platform when slow.
    pub fn synthesize(position: Vec2, velocity: Vec2) -> Self {
        let ahead = position + velocity * LOOK_AHEAD_FRAMES;
        if velocity.length() > RAMP_SPEED {
            Action::Line {
                pos: Vec2::new(ahead.x, ahead.y - 30.0),
                angle: RAMP_ANGLE,
            }
        } else {
            Action::Line {
                pos: Vec2::new(ahead.x, ahead.y + 10.0),
                angle: BOOST_ANGLE,
            }
        }
    }
}

/// Generate the random action for slot `index` of a sequence
pub fn random_action<R: Rng + ?Sized>(rng: &mut R, index: usize) -> Action {
    let base_x = 100.0 + index as f32 * 50.0;
    if rng.random_bool(LINE_PROBABILITY) {
        Action::Line {
            pos: Vec2::new(
                base_x + rng.random_range(-50.0..50.0),
                200.0 + rng.random_range(-100.0..100.0),
            ),
            angle: rng.random_range(-FRAC_PI_4..FRAC_PI_4),
        }
    } else {
        Action::Force {
            pos: Vec2::new(base_x, 200.0),
            force: Vec2::new(
                rng.random_range(-0.005..0.005),
                rng.random_range(-0.005..0.005),
            ),
        }
    }
}

/// Generate `count` random actions indexed from zero
pub fn random_actions<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Action> {
    (0..count).map(|i| random_action(rng, i)).collect()
}

/// One candidate control policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Best fitness observed while this strategy was active
    pub score: f32,
    pub actions: Vec<Action>,
}

impl Strategy {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { score: 0.0, actions }
    }

    /// Fresh strategy with the standard number of random actions
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(random_actions(rng, ACTIONS_PER_STRATEGY))
    }

    /// Raise the score to `fitness` if it beats the current best
    pub fn record(&mut self, fitness: f32) {
        self.score = self.score.max(fitness);
    }
}
