// Ending countdown: announces the end of the round and signals when the end hook is due.

use super::countdown::{CountdownTimer, Scheduler};
use super::types::RoundNotice;
use super::world::RoundContext;
use crate::domain::RoundPhase;
use crate::domain::tuning::RoundTuning;
use tracing::info;

#[derive(Debug)]
pub struct EndingCountdown {
    timer: CountdownTimer,
    duration: u32,
    milestones: Vec<u32>,
}

impl EndingCountdown {
    pub fn new(tuning: &RoundTuning) -> Self {
        Self {
            timer: CountdownTimer::new(tuning.ticks_per_second),
            duration: tuning.ending_seconds,
            milestones: tuning.ending_milestones.clone(),
        }
    }

    /// Returns true once, on the tick the countdown expires.
    pub fn on_tick(&mut self, ctx: &mut RoundContext<'_>) -> bool {
        let Some(remaining) = self.timer.poll() else {
            return false;
        };

        if remaining == 0 {
            self.stop();
            return true;
        }

        if self.milestones.contains(&remaining) {
            ctx.world.broadcast(RoundNotice::Countdown {
                phase: RoundPhase::Ending,
                remaining,
            });
        }
        false
    }
}

impl Scheduler for EndingCountdown {
    fn start(&mut self) {
        if self.timer.start(self.duration) {
            info!(seconds = self.duration, "ending countdown started");
        }
    }

    fn stop(&mut self) {
        self.timer.stop();
    }

    fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}
