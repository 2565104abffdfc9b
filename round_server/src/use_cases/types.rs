// Use-case level inputs/outputs for the round loop.

use crate::domain::{BlockPos, GameMode, PlayerId, Position, RoundPhase};
use serde::Serialize;
use tokio::sync::oneshot;

/// One position update reported by the host for a connected player.
#[derive(Debug, Clone)]
pub struct MovementSample {
    pub player_id: PlayerId,
    pub position: Position,
    pub grounded: bool,
    pub map_name: String,
}

/// Inbound messages processed by the round task in arrival order.
#[derive(Debug)]
pub enum RoundEvent {
    // Replies false when the player id is already connected.
    Join {
        player_id: PlayerId,
        display_name: String,
        reply: oneshot::Sender<bool>,
    },
    Leave {
        player_id: PlayerId,
    },
    Movement(MovementSample),
    // Operator action; replies whether the lobby countdown was shortened.
    ShortenCountdown {
        reply: oneshot::Sender<bool>,
    },
}

/// Outbound round notices broadcast to every connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundNotice {
    PhaseChanged {
        phase: RoundPhase,
    },
    Countdown {
        phase: RoundPhase,
        remaining: u32,
    },
    CountdownLevel {
        remaining: u32,
    },
    CountdownCancelled {
        required_players: usize,
    },
    RoundStarting {
        map_name: String,
    },
    PlayerJoined {
        player_id: PlayerId,
        display_name: String,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerTeleported {
        player_id: PlayerId,
        map_name: String,
        position: Position,
    },
    GameModeChanged {
        player_id: PlayerId,
        mode: GameMode,
    },
    BlocksRemoved {
        map_name: String,
        blocks: Vec<BlockPos>,
    },
    PlayerEliminated {
        player_id: PlayerId,
        remaining: usize,
    },
    SurvivalTime {
        player_id: PlayerId,
        survived_ms: u64,
    },
    Winner {
        player_id: PlayerId,
    },
    ServerStopping,
}

/// What happens when the ending countdown expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndAction {
    // Stop the whole server.
    #[default]
    Shutdown,
    // Return to the lobby and wait for the next round.
    Reset,
}

/// Read-only view of the round published after every tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoundSnapshot {
    pub tick: u64,
    pub phase: RoundPhase,
    pub map_name: Option<String>,
    pub online_players: usize,
    pub alive_players: Vec<PlayerId>,
    pub lobby_countdown: Option<u32>,
}
