//! Strategy evolution
//!
//! A fixed-size population of action lists is scored against the agent's
//! motion and evolved between generations. All randomness comes from one
//! injected `Pcg32` so runs are reproducible from a seed.

pub mod action;
pub mod engine;
pub mod history;

pub use action::{Action, Strategy, random_action, random_actions};
pub use engine::{Population, PopulationStats, StrategyEngine};
pub use history::{PerformanceHistory, Trend};
