// Protection countdown: short invulnerability window before the floor starts to erode.

use super::afk::AfkFloorEraser;
use super::countdown::{CountdownTimer, Scheduler};
use super::types::RoundNotice;
use super::world::RoundContext;
use crate::domain::RoundPhase;
use crate::domain::tuning::RoundTuning;

#[derive(Debug)]
pub struct ProtectionCountdown {
    timer: CountdownTimer,
    duration: u32,
}

impl ProtectionCountdown {
    pub fn new(tuning: &RoundTuning) -> Self {
        Self {
            timer: CountdownTimer::new(tuning.ticks_per_second),
            duration: tuning.protection_seconds,
        }
    }

    /// Returns true on the tick that moves the round into play.
    pub fn on_tick(&mut self, ctx: &mut RoundContext<'_>, afk: &mut AfkFloorEraser) -> bool {
        let Some(remaining) = self.timer.poll() else {
            return false;
        };

        if remaining == 0 {
            self.stop();
            if ctx.state.phase() != RoundPhase::Protection {
                return false;
            }
            ctx.advance_phase();
            afk.start();
            return true;
        }

        ctx.world.broadcast(RoundNotice::Countdown {
            phase: RoundPhase::Protection,
            remaining,
        });
        false
    }
}

impl Scheduler for ProtectionCountdown {
    fn start(&mut self) {
        self.timer.start(self.duration);
    }

    fn stop(&mut self) {
        self.timer.stop();
    }

    fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}
