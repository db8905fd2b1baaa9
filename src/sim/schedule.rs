//! Timer and event queue for the simulation loops
//!
//! Two cancellable periodic tasks (decision, generation) and the per-frame
//! callback all post onto one queue. A single consumer drains it, so each
//! event's work runs to completion before the next one starts.

use std::collections::VecDeque;

/// Unit of work posted to the queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// Display refresh: step physics by `dt_ms`
    Frame { dt_ms: f32 },
    /// AI decision cadence
    DecisionTick,
    /// Generation boundary
    GenerationTick,
}

/// A repeating timer on the virtual clock
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicTask {
    period_ms: u64,
    next_due_ms: Option<u64>,
}

impl PeriodicTask {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due_ms: None,
        }
    }

    /// Start firing one period after `now_ms`
    pub fn arm(&mut self, now_ms: u64) {
        self.next_due_ms = Some(now_ms + self.period_ms);
    }

    pub fn cancel(&mut self) {
        self.next_due_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due_ms.is_some()
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.next_due_ms
    }

    /// Consume the firing due at or before `now_ms`. Firings missed during a
    /// clock jump collapse into this one and the next is scheduled after `now_ms`.
    fn pop_due(&mut self, now_ms: u64) -> Option<u64> {
        let due = self.next_due_ms.filter(|&due| due <= now_ms)?;
        let missed = (now_ms - due) / self.period_ms;
        self.next_due_ms = Some(due + (missed + 1) * self.period_ms);
        Some(due)
    }
}

/// Virtual clock, AI timers and the work queue
#[derive(Debug, Clone)]
pub struct Scheduler {
    now_ms: u64,
    decision: PeriodicTask,
    generation: PeriodicTask,
    queue: VecDeque<SimEvent>,
}

impl Scheduler {
    pub fn new(decision_period_ms: u64, generation_interval_ms: u64) -> Self {
        Self {
            now_ms: 0,
            decision: PeriodicTask::new(decision_period_ms),
            generation: PeriodicTask::new(generation_interval_ms),
            queue: VecDeque::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn decision(&self) -> &PeriodicTask {
        &self.decision
    }

    pub fn generation(&self) -> &PeriodicTask {
        &self.generation
    }

    /// Start both AI timers from the current time
    pub fn arm_ai_timers(&mut self) {
        self.decision.arm(self.now_ms);
        self.generation.arm(self.now_ms);
    }

    /// Restart the generation clock (after a boundary or reset)
    pub fn restart_generation(&mut self) {
        if self.generation.is_armed() {
            self.generation.arm(self.now_ms);
        }
    }

    /// Stop both AI timers and drop any of their ticks still queued
    pub fn cancel_ai_timers(&mut self) {
        self.decision.cancel();
        self.generation.cancel();
        self.queue
            .retain(|event| matches!(event, SimEvent::Frame { .. }));
    }

    /// Move the clock to `now_ms`, posting at most one tick per timer in the
    /// order they came due. The clock never runs backwards.
    pub fn advance_to(&mut self, now_ms: u64) {
        if now_ms < self.now_ms {
            return;
        }
        loop {
            let next_decision = self.decision.next_due_ms().filter(|&t| t <= now_ms);
            let next_generation = self.generation.next_due_ms().filter(|&t| t <= now_ms);
            let event = match (next_decision, next_generation) {
                (Some(d), Some(g)) if d <= g => {
                    self.decision.pop_due(now_ms);
                    SimEvent::DecisionTick
                }
                (_, Some(_)) => {
                    self.generation.pop_due(now_ms);
                    SimEvent::GenerationTick
                }
                (Some(_), None) => {
                    self.decision.pop_due(now_ms);
                    SimEvent::DecisionTick
                }
                (None, None) => break,
            };
            self.queue.push_back(event);
        }
        self.now_ms = now_ms;
    }

    pub fn post(&mut self, event: SimEvent) {
        self.queue.push_back(event);
    }

    /// Next event for the single consumer
    pub fn next_event(&mut self) -> Option<SimEvent> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
