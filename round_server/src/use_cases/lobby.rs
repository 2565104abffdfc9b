// Lobby countdown: waits out the start timer, then freezes the round and moves into protection.

use super::countdown::{CountdownTimer, Scheduler};
use super::protection::ProtectionCountdown;
use super::types::RoundNotice;
use super::world::RoundContext;
use crate::domain::errors::RoundStartError;
use crate::domain::ports::MapRegistry;
use crate::domain::tuning::RoundTuning;
use crate::domain::{Arena, GameMode, RoundConfig, RoundPhase};
use rand::seq::SliceRandom;
use tracing::{error, info};

#[derive(Debug)]
pub struct LobbyCountdown {
    timer: CountdownTimer,
    duration: u32,
    milestones: Vec<u32>,
}

impl LobbyCountdown {
    pub fn new(tuning: &RoundTuning) -> Self {
        Self {
            timer: CountdownTimer::new(tuning.ticks_per_second),
            duration: tuning.lobby_seconds,
            milestones: tuning.lobby_milestones.clone(),
        }
    }

    /// Seconds left while the countdown runs.
    pub fn remaining(&self) -> Option<u32> {
        self.timer.is_running().then(|| self.timer.remaining())
    }

    /// Pulls the countdown down to `floor`. Never lengthens it.
    pub fn shorten(&mut self, floor: u32) -> bool {
        if !self.timer.is_running() || self.timer.remaining() <= floor {
            return false;
        }
        info!(from = self.timer.remaining(), to = floor, "lobby countdown shortened");
        self.timer.set_remaining(floor)
    }

    pub fn on_tick(&mut self, ctx: &mut RoundContext<'_>, protection: &mut ProtectionCountdown) {
        let Some(remaining) = self.timer.poll() else {
            return;
        };

        ctx.world.set_levels(remaining);
        ctx.world
            .broadcast(RoundNotice::CountdownLevel { remaining });

        if remaining == 0 {
            self.start_round(ctx, protection);
            return;
        }

        if self.milestones.contains(&remaining) {
            ctx.world.broadcast(RoundNotice::Countdown {
                phase: RoundPhase::Lobby,
                remaining,
            });
        }
    }

    fn start_round(&mut self, ctx: &mut RoundContext<'_>, protection: &mut ProtectionCountdown) {
        if ctx.state.phase() != RoundPhase::Lobby {
            self.stop();
            return;
        }

        let now_ms = ctx.clock.now_epoch_millis();
        let (config, arena) = match resolve_round(ctx.maps, now_ms) {
            Ok(resolved) => resolved,
            Err(error) => {
                // Stay in the lobby; the next join restarts the countdown.
                error!(%error, "round start aborted");
                self.stop();
                return;
            }
        };

        info!(
            map_name = %config.map_name,
            death_height = config.death_height,
            players = ctx.world.online_count(),
            "round starting"
        );

        let spawn = config.spawn.center();
        let players = ctx.world.player_ids();
        for player_id in &players {
            ctx.world.teleport(*player_id, &config.map_name, spawn);
            ctx.world.set_mode(*player_id, GameMode::Adventure);
        }

        ctx.world.broadcast(RoundNotice::RoundStarting {
            map_name: config.map_name.clone(),
        });
        ctx.world.arena = Some(arena);
        ctx.state.roster.seed(players);
        ctx.state.config = Some(config);
        ctx.advance_phase();

        if !protection.is_running() {
            protection.start();
        }
        self.stop();
    }
}

impl Scheduler for LobbyCountdown {
    fn start(&mut self) {
        if self.timer.start(self.duration) {
            info!(seconds = self.duration, "lobby countdown started");
        }
    }

    fn stop(&mut self) {
        if self.timer.stop() {
            info!("lobby countdown stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}

/// Picks a random configured map and resolves everything the round needs from it.
fn resolve_round(
    maps: &dyn MapRegistry,
    now_ms: u64,
) -> Result<(RoundConfig, Arena), RoundStartError> {
    let names = maps.list_maps();
    let map_name = names
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or(RoundStartError::NoMaps)?;

    let arena = maps.load_map(&map_name)?;
    let spawn = maps
        .spawn_point(&map_name)
        .ok_or_else(|| RoundStartError::MissingSpawn(map_name.clone()))?;
    let death_height = maps.death_height(&map_name);

    Ok((
        RoundConfig {
            map_name,
            spawn,
            death_height,
            started_at_ms: now_ms,
        },
        arena,
    ))
}
