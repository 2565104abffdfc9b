// Round engine: owns the round state and routes events and ticks to the components.

use super::afk::AfkFloorEraser;
use super::countdown::Scheduler;
use super::elimination::EliminationDetector;
use super::ending::EndingCountdown;
use super::lobby::LobbyCountdown;
use super::protection::ProtectionCountdown;
use super::supervisor::RoundSupervisor;
use super::types::{EndAction, MovementSample, RoundEvent, RoundNotice, RoundSnapshot};
use super::world::{RoundContext, RoundWorld};
use crate::domain::ports::{Clock, MapRegistry, StatsSink};
use crate::domain::tuning::RoundTuning;
use crate::domain::{GameMode, OnlinePlayer, PlayerId, RoundPhase, RoundState};
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators the engine reaches through ports.
#[derive(Clone)]
pub struct RoundPorts {
    pub maps: Arc<dyn MapRegistry>,
    pub stats: Arc<dyn StatsSink>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug)]
struct Components {
    lobby: LobbyCountdown,
    protection: ProtectionCountdown,
    afk: AfkFloorEraser,
    ending: EndingCountdown,
    supervisor: RoundSupervisor,
    detector: EliminationDetector,
}

pub struct RoundEngine {
    state: RoundState,
    world: RoundWorld,
    ports: RoundPorts,
    tuning: RoundTuning,
    components: Components,
    end_action: EndAction,
    stop_requested: bool,
    tick: u64,
}

impl RoundEngine {
    pub fn new(ports: RoundPorts, tuning: RoundTuning, end_action: EndAction) -> Self {
        let components = Components {
            lobby: LobbyCountdown::new(&tuning),
            protection: ProtectionCountdown::new(&tuning),
            afk: AfkFloorEraser::new(&tuning),
            ending: EndingCountdown::new(&tuning),
            supervisor: RoundSupervisor::new(),
            detector: EliminationDetector::new(),
        };
        Self {
            state: RoundState::default(),
            world: RoundWorld::default(),
            ports,
            tuning,
            components,
            end_action,
            stop_requested: false,
            tick: 0,
        }
    }

    // Splits the engine into the shared context and the components it drives.
    fn split(&mut self) -> (RoundContext<'_>, &mut Components) {
        let Self {
            state,
            world,
            ports,
            tuning,
            components,
            ..
        } = self;
        let ctx = RoundContext {
            state,
            world,
            maps: ports.maps.as_ref(),
            stats: ports.stats.as_ref(),
            clock: ports.clock.as_ref(),
            tuning,
        };
        (ctx, components)
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase()
    }

    /// True once the end-of-round hook asked the server to stop.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn drain_notices(&mut self) -> Vec<RoundNotice> {
        self.world.drain_notices()
    }

    pub fn handle(&mut self, event: RoundEvent) {
        match event {
            RoundEvent::Join {
                player_id,
                display_name,
                reply,
            } => {
                let accepted = self.join(player_id, display_name);
                let _ = reply.send(accepted);
            }
            RoundEvent::Leave { player_id } => self.leave(player_id),
            RoundEvent::Movement(sample) => self.movement(sample),
            RoundEvent::ShortenCountdown { reply } => {
                let shortened = self.request_shorten();
                let _ = reply.send(shortened);
            }
        }
    }

    /// Returns false when the player is already online; the existing session is kept.
    pub fn join(&mut self, player_id: PlayerId, display_name: String) -> bool {
        if self.world.players.contains_key(&player_id) {
            warn!(%player_id, "duplicate join ignored");
            return false;
        }
        info!(%player_id, %display_name, phase = ?self.state.phase(), "player joined");
        self.world.players.insert(
            player_id,
            OnlinePlayer::new(player_id, display_name.clone()),
        );

        let (mut ctx, parts) = self.split();
        ctx.world.broadcast(RoundNotice::PlayerJoined {
            player_id,
            display_name,
        });

        if ctx.state.phase() == RoundPhase::Lobby {
            ctx.world.set_mode(player_id, GameMode::Adventure);
            send_to_waiting_spawn(&mut ctx, player_id);
            parts.supervisor.on_player_count_increased(&mut ctx, &mut parts.lobby);
            return true;
        }

        // Late joiners watch the round in progress.
        ctx.world.set_mode(player_id, GameMode::Spectator);
        if let Some(config) = ctx.state.config.as_ref() {
            let spawn = config.spawn.center();
            let map_name = config.map_name.clone();
            ctx.world.teleport(player_id, &map_name, spawn);
        }
        true
    }

    pub fn leave(&mut self, player_id: PlayerId) {
        if self.world.players.remove(&player_id).is_none() {
            return;
        }
        self.components.afk.forget(&player_id);
        let online = self.world.online_count();
        info!(%player_id, online, phase = ?self.state.phase(), "player left");

        let (mut ctx, parts) = self.split();
        match ctx.state.phase() {
            RoundPhase::Lobby => {
                ctx.world.broadcast(RoundNotice::PlayerLeft { player_id });
                parts.supervisor.on_player_count_decreased(&mut ctx, &mut parts.lobby, online);
            }
            RoundPhase::Protection => {
                ctx.state.roster.remove(&player_id);
            }
            RoundPhase::Ingame => {
                if ctx.state.roster.remove(&player_id) {
                    parts.detector.settle_round(&mut ctx, &mut parts.ending);
                }
            }
            RoundPhase::Ending => {}
        }
    }

    pub fn movement(&mut self, sample: MovementSample) {
        let Some(player) = self.world.players.get_mut(&sample.player_id) else {
            return;
        };
        player.position = sample.position;
        player.grounded = sample.grounded;
        player.map_name.clone_from(&sample.map_name);

        let (mut ctx, parts) = self.split();
        parts.detector.on_movement(&mut ctx, &mut parts.ending, &sample);
    }

    pub fn request_shorten(&mut self) -> bool {
        let (ctx, parts) = self.split();
        parts.supervisor.request_shorten(&ctx, &mut parts.lobby)
    }

    /// Advances every component by one engine tick.
    pub fn tick(&mut self) {
        self.tick += 1;
        // Erosions deferred from the previous tick land first.
        self.world.run_pending_erosions();

        let (mut ctx, parts) = self.split();
        parts.lobby.on_tick(&mut ctx, &mut parts.protection);
        if parts.protection.on_tick(&mut ctx, &mut parts.afk) {
            // Everyone may have left during protection.
            parts.detector.settle_round(&mut ctx, &mut parts.ending);
        }
        parts.afk.on_tick(&mut ctx);
        if parts.ending.on_tick(&mut ctx) {
            self.finish_round();
        }
    }

    fn finish_round(&mut self) {
        match self.end_action {
            EndAction::Shutdown => {
                info!("round finished, stopping server");
                self.world.broadcast(RoundNotice::ServerStopping);
                self.stop_requested = true;
            }
            EndAction::Reset => self.reset_round(),
        }
    }

    /// Returns everyone to the lobby for the next round.
    fn reset_round(&mut self) {
        let (mut ctx, parts) = self.split();
        parts.protection.stop();
        parts.afk.stop();
        parts.ending.stop();

        if ctx.state.phase() == RoundPhase::Ending {
            ctx.advance_phase();
        }
        ctx.state.reset();
        ctx.world.unload_arena();
        ctx.world.set_levels(0);
        for player_id in ctx.world.player_ids() {
            ctx.world.set_mode(player_id, GameMode::Adventure);
            send_to_waiting_spawn(&mut ctx, player_id);
        }
        info!(online = ctx.world.online_count(), "round reset to lobby");

        parts.supervisor.on_player_count_increased(&mut ctx, &mut parts.lobby);
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        let mut alive_players: Vec<PlayerId> = self.state.roster.players().copied().collect();
        alive_players.sort();
        RoundSnapshot {
            tick: self.tick,
            phase: self.state.phase(),
            map_name: self
                .state
                .config
                .as_ref()
                .map(|config| config.map_name.clone()),
            online_players: self.world.online_count(),
            alive_players,
            lobby_countdown: self.components.lobby.remaining(),
        }
    }
}

fn send_to_waiting_spawn(ctx: &mut RoundContext<'_>, player_id: PlayerId) {
    let Some(waiting) = ctx.maps.waiting_map() else {
        return;
    };
    if let Some(spawn) = ctx.maps.spawn_point(&waiting) {
        ctx.world.teleport(player_id, &waiting, spawn.center());
    }
}
