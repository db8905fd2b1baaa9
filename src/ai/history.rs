//! Bounded fitness history used to steer the mutation rate

use std::collections::VecDeque;

use crate::consts::{HISTORY_CAPACITY, TREND_WINDOW};

/// Direction of recent fitness compared with the window before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Stalled,
}

/// Fixed-capacity FIFO of fitness samples; the oldest sample is evicted on overflow
#[derive(Debug, Clone)]
pub struct PerformanceHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl Default for PerformanceHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl PerformanceHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, fitness: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(fitness);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.samples.iter()
    }

    /// Mean of `len` samples ending `skip` samples before the newest.
    /// `None` unless the full window is available.
    pub fn window_mean(&self, skip: usize, len: usize) -> Option<f32> {
        if len == 0 || self.samples.len() < skip + len {
            return None;
        }
        let end = self.samples.len() - skip;
        let sum: f32 = self.samples.range(end - len..end).sum();
        Some(sum / len as f32)
    }

    /// Compare the newest window with the one before it.
    /// `None` until two full windows have been recorded.
    pub fn trend(&self) -> Option<Trend> {
        let recent = self.window_mean(0, TREND_WINDOW)?;
        let older = self.window_mean(TREND_WINDOW, TREND_WINDOW)?;
        Some(if recent > older {
            Trend::Improving
        } else {
            Trend::Stalled
        })
    }
}
