// Everything the round components touch while handling one event or tick.

use super::types::RoundNotice;
use crate::domain::ports::{Clock, MapRegistry, StatsSink};
use crate::systems::erosion;
use crate::domain::tuning::RoundTuning;
use crate::domain::{
    Arena, BlockPos, GameMode, OnlinePlayer, PlayerId, Position, RoundPhase, RoundState,
};
use std::collections::HashMap;
use tracing::info;

/// Connected players, the active arena and the pending outbound notices.
#[derive(Debug, Default)]
pub struct RoundWorld {
    pub players: HashMap<PlayerId, OnlinePlayer>,
    pub arena: Option<Arena>,
    // Erosions queued during this tick; applied at the start of the next one.
    pending_erosions: Vec<[BlockPos; 2]>,
    notices: Vec<RoundNotice>,
}

impl RoundWorld {
    pub fn online_count(&self) -> usize {
        self.players.len()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn broadcast(&mut self, notice: RoundNotice) {
        self.notices.push(notice);
    }

    pub fn drain_notices(&mut self) -> Vec<RoundNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn teleport(&mut self, player_id: PlayerId, map_name: &str, position: Position) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        player.map_name = map_name.to_string();
        player.position = position;
        player.grounded = false;
        self.notices.push(RoundNotice::PlayerTeleported {
            player_id,
            map_name: map_name.to_string(),
            position,
        });
    }

    pub fn set_mode(&mut self, player_id: PlayerId, mode: GameMode) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        if player.mode == mode {
            return;
        }
        player.mode = mode;
        self.notices
            .push(RoundNotice::GameModeChanged { player_id, mode });
    }

    /// Shows the countdown value on every player's level bar.
    pub fn set_levels(&mut self, level: u32) {
        for player in self.players.values_mut() {
            player.level = level;
        }
    }

    /// Removes an erodible column from the active arena right away.
    pub fn erode_now(&mut self, column: [BlockPos; 2]) {
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let removed = erosion::erode(arena, &column);
        if removed.is_empty() {
            return;
        }
        let map_name = arena.name().to_string();
        self.notices.push(RoundNotice::BlocksRemoved {
            map_name,
            blocks: removed,
        });
    }

    pub fn schedule_erosion(&mut self, column: [BlockPos; 2]) {
        self.pending_erosions.push(column);
    }

    pub fn pending_erosions(&self) -> usize {
        self.pending_erosions.len()
    }

    /// Applies erosions scheduled during the previous tick.
    pub fn run_pending_erosions(&mut self) {
        let pending = std::mem::take(&mut self.pending_erosions);
        for column in pending {
            self.erode_now(column);
        }
    }

    /// Drops the arena and anything still queued against it.
    pub fn unload_arena(&mut self) {
        self.arena = None;
        self.pending_erosions.clear();
    }
}

/// Borrowed view handed to schedulers, the detector and the supervisor.
pub struct RoundContext<'a> {
    pub state: &'a mut RoundState,
    pub world: &'a mut RoundWorld,
    pub maps: &'a dyn MapRegistry,
    pub stats: &'a dyn StatsSink,
    pub clock: &'a dyn Clock,
    pub tuning: &'a RoundTuning,
}

impl RoundContext<'_> {
    /// Moves the round to its next phase and announces it.
    pub fn advance_phase(&mut self) -> RoundPhase {
        let from = self.state.phase();
        let to = self.state.advance();
        info!(?from, ?to, "round phase changed");
        self.world.broadcast(RoundNotice::PhaseChanged { phase: to });
        to
    }
}
