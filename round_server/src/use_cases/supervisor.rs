// Round supervisor: starts and cancels the lobby countdown as players come and go.

use super::countdown::Scheduler;
use super::lobby::LobbyCountdown;
use super::types::RoundNotice;
use super::world::RoundContext;
use crate::domain::RoundPhase;
use tracing::info;

#[derive(Debug, Default)]
pub struct RoundSupervisor;

impl RoundSupervisor {
    pub fn new() -> Self {
        Self
    }

    pub fn on_player_count_increased(&self, ctx: &mut RoundContext<'_>, lobby: &mut LobbyCountdown) {
        let online = ctx.world.online_count();
        if lobby.is_running()
            || ctx.state.phase() != RoundPhase::Lobby
            || online < ctx.tuning.min_players
        {
            return;
        }
        info!(online, "enough players online");
        lobby.start();
    }

    pub fn on_player_count_decreased(
        &self,
        ctx: &mut RoundContext<'_>,
        lobby: &mut LobbyCountdown,
        online: usize,
    ) {
        if !lobby.is_running() || online >= ctx.tuning.min_players {
            return;
        }
        lobby.stop();
        ctx.world.set_levels(0);
        ctx.world.broadcast(RoundNotice::CountdownCancelled {
            required_players: ctx.tuning.min_players,
        });
    }

    /// Operator action. False when the countdown is stopped or already at or below the floor.
    pub fn request_shorten(&self, ctx: &RoundContext<'_>, lobby: &mut LobbyCountdown) -> bool {
        lobby.shorten(ctx.tuning.shorten_floor)
    }
}
