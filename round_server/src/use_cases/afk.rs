// AFK floor eraser: players who stand still lose the floor under them.

use super::countdown::{CountdownTimer, Scheduler};
use super::world::RoundContext;
use crate::systems::erosion;
use crate::domain::tuning::RoundTuning;
use crate::domain::{GameMode, PlayerId, Position, RoundPhase};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug)]
pub struct AfkFloorEraser {
    timer: CountdownTimer,
    scan_secs: f64,
    standing_speed: f64,
    // Position of each player at the previous scan.
    last_seen: HashMap<PlayerId, Position>,
}

impl AfkFloorEraser {
    pub fn new(tuning: &RoundTuning) -> Self {
        let scan_ticks = tuning.afk_scan_ticks.max(1);
        Self {
            timer: CountdownTimer::new(scan_ticks),
            scan_secs: f64::from(scan_ticks) / f64::from(tuning.ticks_per_second.max(1)),
            standing_speed: tuning.standing_speed,
            last_seen: HashMap::new(),
        }
    }

    pub fn forget(&mut self, player_id: &PlayerId) {
        self.last_seen.remove(player_id);
    }

    pub fn on_tick(&mut self, ctx: &mut RoundContext<'_>) {
        if self.timer.poll().is_none() {
            return;
        }
        if ctx.state.phase() == RoundPhase::Ending {
            self.stop();
            return;
        }
        let Some(config) = ctx.state.config.as_ref() else {
            return;
        };

        let mut columns = Vec::new();
        let mut seen = HashMap::with_capacity(ctx.world.players.len());
        for player in ctx.world.players.values() {
            if player.mode == GameMode::Spectator || !config.is_round_map(&player.map_name) {
                continue;
            }
            seen.insert(player.id, player.position);

            // First sighting only establishes a baseline.
            let Some(previous) = self.last_seen.get(&player.id) else {
                continue;
            };
            let speed = erosion::horizontal_speed(previous, &player.position, self.scan_secs);
            if speed != self.standing_speed {
                continue;
            }
            let Some(arena) = ctx.world.arena.as_ref() else {
                continue;
            };
            if let Some(column) = erosion::erodible_column(arena, &player.position) {
                debug!(player_id = %player.id, ?column, "eroding floor under idle player");
                columns.push(column);
            }
        }
        self.last_seen = seen;

        for column in columns {
            ctx.world.erode_now(column);
        }
    }
}

impl Scheduler for AfkFloorEraser {
    fn start(&mut self) {
        self.timer.start(0);
    }

    fn stop(&mut self) {
        if self.timer.stop() {
            self.last_seen.clear();
        }
    }

    fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}
