// Elimination detector: reacts to movement samples while the round is in play.

use super::countdown::Scheduler;
use super::ending::EndingCountdown;
use super::types::{MovementSample, RoundNotice};
use super::world::RoundContext;
use crate::systems::erosion;
use crate::domain::{GameMode, PlayerId, RoundPhase};
use tracing::info;

#[derive(Debug, Default)]
pub struct EliminationDetector;

impl EliminationDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn on_movement(
        &self,
        ctx: &mut RoundContext<'_>,
        ending: &mut EndingCountdown,
        sample: &MovementSample,
    ) {
        if ctx.state.phase() != RoundPhase::Ingame || !ctx.state.roster.contains(&sample.player_id)
        {
            return;
        }
        let Some(config) = ctx.state.config.as_ref() else {
            return;
        };
        if !config.is_round_map(&sample.map_name) {
            return;
        }
        let death_height = config.death_height;

        if sample.grounded {
            let column = ctx
                .world
                .arena
                .as_ref()
                .and_then(|arena| erosion::erodible_column(arena, &sample.position));
            if let Some(column) = column {
                ctx.world.schedule_erosion(column);
            }
        }

        if sample.position.level() <= death_height {
            self.eliminate(ctx, ending, sample.player_id);
        }
    }

    fn eliminate(
        &self,
        ctx: &mut RoundContext<'_>,
        ending: &mut EndingCountdown,
        player_id: PlayerId,
    ) {
        let Some(config) = ctx.state.config.clone() else {
            return;
        };
        if !ctx.state.roster.remove(&player_id) {
            return;
        }

        ctx.world.set_mode(player_id, GameMode::Spectator);
        ctx.world
            .teleport(player_id, &config.map_name, config.spawn.center());

        let remaining = ctx.state.roster.len();
        ctx.world.broadcast(RoundNotice::PlayerEliminated {
            player_id,
            remaining,
        });

        let survived_ms = config.survival_millis(ctx.clock.now_epoch_millis());
        ctx.world.broadcast(RoundNotice::SurvivalTime {
            player_id,
            survived_ms,
        });
        info!(%player_id, remaining, survived_ms, "player eliminated");

        ctx.stats.record_loss(player_id);
        ctx.stats.update_best_survival_time(player_id, survived_ms);

        if remaining == 1 {
            self.settle_round(ctx, ending);
        }
    }

    /// Ends the round when at most one player is left in play. Runs at most once per round.
    pub fn settle_round(&self, ctx: &mut RoundContext<'_>, ending: &mut EndingCountdown) {
        if ctx.state.phase() != RoundPhase::Ingame || ending.is_running() {
            return;
        }
        match ctx.state.roster.len() {
            0 => {
                info!("round ended without a winner");
                ctx.advance_phase();
                ending.start();
            }
            1 => {
                if let Some(winner) = ctx.state.roster.sole_survivor() {
                    self.declare_winner(ctx, ending, winner);
                }
            }
            _ => {}
        }
    }

    fn declare_winner(
        &self,
        ctx: &mut RoundContext<'_>,
        ending: &mut EndingCountdown,
        winner: PlayerId,
    ) {
        let survived_ms = ctx
            .state
            .config
            .as_ref()
            .map_or(0, |config| config.survival_millis(ctx.clock.now_epoch_millis()));

        info!(player_id = %winner, survived_ms, "round won");
        ctx.world
            .broadcast(RoundNotice::Winner { player_id: winner });
        ctx.advance_phase();

        ctx.stats.record_win(winner);
        ctx.stats.update_best_survival_time(winner, survived_ms);

        ending.start();
    }
}
