// Reusable tick-driven countdown shared by every phase scheduler.

/// Capability shared by all round schedulers.
pub trait Scheduler {
    /// No-op when already running.
    fn start(&mut self);
    /// No-op when not running.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Cancellable repeating countdown driven by the round loop's fixed tick.
///
/// A started timer fires on the next engine tick and then once every `period_ticks`.
/// Each firing yields the current remaining value, which is decremented afterwards.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    period_ticks: u32,
    remaining: u32,
    running: bool,
    ticks_until_fire: u32,
}

impl CountdownTimer {
    pub fn new(period_ticks: u32) -> Self {
        Self {
            period_ticks: period_ticks.max(1),
            remaining: 0,
            running: false,
            ticks_until_fire: 0,
        }
    }

    /// Returns false if the timer was already running.
    pub fn start(&mut self, initial: u32) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.remaining = initial;
        self.ticks_until_fire = 0;
        true
    }

    /// Returns false if the timer was not running.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Only allowed while running.
    pub fn set_remaining(&mut self, remaining: u32) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = remaining;
        true
    }

    /// Advances by one engine tick. Returns the countdown value if the timer fires now.
    pub fn poll(&mut self) -> Option<u32> {
        if !self.running {
            return None;
        }
        if self.ticks_until_fire > 0 {
            self.ticks_until_fire -= 1;
            return None;
        }
        self.ticks_until_fire = self.period_ticks - 1;
        let current = self.remaining;
        self.remaining = self.remaining.saturating_sub(1);
        Some(current)
    }
}
