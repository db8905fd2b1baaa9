//! Strategy evolution engine
//!
//! Owns the population, picks the next action for the agent, records fitness
//! and breeds the next generation (truncation selection, one-point crossover,
//! per-action mutation) with an adaptive mutation rate.

use glam::Vec2;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::action::{Action, Strategy, random_actions};
use super::history::{PerformanceHistory, Trend};
use crate::consts::*;

/// The evolving set of strategies plus generation bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population {
    pub generation: u32,
    pub best_score_ever: f32,
    pub strategies: Vec<Strategy>,
    /// Index of the strategy currently driving the agent
    pub current_strategy: usize,
    pub mutation_rate: f32,
}

impl Population {
    /// Fresh generation-zero population of random strategies
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_strategies((0..POPULATION_SIZE).map(|_| Strategy::random(rng)).collect())
    }

    /// Generation-zero population built from explicit strategies
    pub fn from_strategies(strategies: Vec<Strategy>) -> Self {
        Self {
            generation: 0,
            best_score_ever: 0.0,
            strategies,
            current_strategy: 0,
            mutation_rate: INITIAL_MUTATION_RATE,
        }
    }

    pub fn current(&self) -> Option<&Strategy> {
        self.strategies.get(self.current_strategy)
    }

    pub fn current_mut(&mut self) -> Option<&mut Strategy> {
        self.strategies.get_mut(self.current_strategy)
    }

    pub fn average_score(&self) -> f32 {
        if self.strategies.is_empty() {
            return 0.0;
        }
        self.strategies.iter().map(|s| s.score).sum::<f32>() / self.strategies.len() as f32
    }
}

/// Snapshot of population statistics for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub generation: u32,
    pub best_score_ever: f32,
    pub current_strategy: usize,
    pub population_size: usize,
    pub mutation_rate: f32,
    pub average_score: f32,
}

/// Genetic algorithm driving the AI controller
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    population: Population,
    history: PerformanceHistory,
    rng: Pcg32,
}

impl StrategyEngine {
    /// Create an engine with a random population drawn from `rng`
    pub fn new(mut rng: Pcg32) -> Self {
        let population = Population::random(&mut rng);
        Self::with_population(rng, population)
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(Pcg32::seed_from_u64(seed))
    }

    /// Create an engine around an existing population
    pub fn with_population(rng: Pcg32, population: Population) -> Self {
        Self {
            population,
            history: PerformanceHistory::default(),
            rng,
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn history(&self) -> &PerformanceHistory {
        &self.history
    }

    pub fn mutation_rate(&self) -> f32 {
        self.population.mutation_rate
    }

    /// Choose what the agent should do next.
    ///
    /// Picks uniformly among the current strategy's reachable actions, or
    /// synthesizes one from the agent's motion when none are reachable.
    /// Returns `None` only when the population is empty.
    pub fn next_action(&mut self, position: Vec2, velocity: Vec2) -> Option<Action> {
        let strategy = self.population.current()?;
        let candidates: Vec<Action> = strategy
            .actions
            .iter()
            .filter(|a| a.is_reachable_from(position))
            .copied()
            .collect();

        match candidates.choose(&mut self.rng) {
            Some(action) => Some(*action),
            None => Some(Action::synthesize(position, velocity)),
        }
    }

    /// Record fitness for the active strategy
    pub fn update_score(&mut self, raw_score: f32, flips: u32, airborne: bool) {
        let fitness = fitness(raw_score, flips, airborne);
        let Some(strategy) = self.population.current_mut() else {
            return;
        };
        strategy.record(fitness);
        self.population.best_score_ever = self.population.best_score_ever.max(fitness);
        self.history.push(fitness);
    }

    /// Breed the next generation
    pub fn evolve(&mut self) {
        let mut ranked = std::mem::take(&mut self.population.strategies);
        // sort_by is stable: ties keep their previous order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(POPULATION_SIZE / 2);
        let survivors = ranked;

        let mut next = survivors.clone();
        while next.len() < POPULATION_SIZE && !survivors.is_empty() {
            let child = if survivors.len() > 1 && self.rng.random_bool(CROSSOVER_PROBABILITY) {
                let p1 = &survivors[self.rng.random_range(0..survivors.len())];
                let p2 = &survivors[self.rng.random_range(0..survivors.len())];
                crossover(&mut self.rng, p1, p2)
            } else {
                let parent = &survivors[self.rng.random_range(0..survivors.len())];
                mutate(&mut self.rng, parent, self.population.mutation_rate)
            };
            next.push(child);
        }

        self.population.strategies = next;
        self.population.generation += 1;
        self.population.current_strategy = 0;
        self.adapt_mutation_rate();
    }

    fn adapt_mutation_rate(&mut self) {
        let Some(trend) = self.history.trend() else {
            log::debug!(
                "Skipping mutation rate adaptation ({} samples)",
                self.history.len()
            );
            return;
        };
        let rate = self.population.mutation_rate;
        self.population.mutation_rate = match trend {
            Trend::Improving => (rate * 0.9).max(MIN_MUTATION_RATE),
            Trend::Stalled => (rate * 1.1).min(MAX_MUTATION_RATE),
        };
        log::debug!(
            "Mutation rate {:?}: {:.3} -> {:.3}",
            trend,
            rate,
            self.population.mutation_rate
        );
    }

    /// Advance to the next strategy, wrapping around
    pub fn switch_strategy(&mut self) {
        let len = self.population.strategies.len();
        if len > 0 {
            self.population.current_strategy = (self.population.current_strategy + 1) % len;
        }
    }

    /// Start over from a fresh random generation zero
    pub fn reset(&mut self) {
        self.population = Population::random(&mut self.rng);
        self.history.clear();
    }

    pub fn stats(&self) -> PopulationStats {
        PopulationStats {
            generation: self.population.generation,
            best_score_ever: self.population.best_score_ever,
            current_strategy: self.population.current_strategy,
            population_size: self.population.strategies.len(),
            mutation_rate: self.population.mutation_rate,
            average_score: self.population.average_score(),
        }
    }
}

/// Fitness combining raw motion score, flips and air time
pub fn fitness(raw_score: f32, flips: u32, airborne: bool) -> f32 {
    let air = if airborne { 1.0 } else { 0.0 };
    raw_score + flips as f32 * FLIP_BONUS + air * AIR_BONUS
}

/// One-point crossover: `p1[..c]` followed by `p2[c..]` with `c` drawn from `[0, min_len)`
pub fn crossover<R: Rng + ?Sized>(rng: &mut R, p1: &Strategy, p2: &Strategy) -> Strategy {
    let min_len = p1.actions.len().min(p2.actions.len());
    let point = if min_len == 0 {
        0
    } else {
        rng.random_range(0..min_len)
    };
    let mut actions = Vec::with_capacity(p2.actions.len());
    actions.extend_from_slice(&p1.actions[..point]);
    actions.extend_from_slice(&p2.actions[point..]);
    Strategy::new(actions)
}

/// Copy `parent`, jittering each action with probability `rate` and
/// occasionally growing the list by a couple of random actions
pub fn mutate<R: Rng + ?Sized>(rng: &mut R, parent: &Strategy, rate: f32) -> Strategy {
    let rate = f64::from(rate.clamp(0.0, 1.0));
    let mut actions = parent.actions.clone();
    for action in &mut actions {
        if rng.random_bool(rate) {
            action.jitter(rng);
        }
    }
    if rng.random_bool(rate) {
        actions.extend(random_actions(rng, GROWTH_ACTIONS));
    }
    Strategy::new(actions)
}
