// Wire protocol DTOs and conversions for the host connection and the HTTP API.

use crate::domain::{PlayerId, PlayerStats, Position, Rank, RoundPhase};
use crate::use_cases::{MovementSample, RoundNotice, RoundSnapshot};
use serde::{Deserialize, Serialize};

/// Messages the server pushes to connected hosts over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Confirms the Join handshake.
    Identity { player_id: String },
    // Round notice produced by the engine.
    Notice(RoundNotice),
    // Current round snapshot, sent once after joining.
    Round(RoundSnapshotDto),
}

/// Messages hosts send over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Must be the first message on every connection.
    Join(JoinPayload),
    // Position report for the joined player.
    Move(MovePayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub player_id: PlayerId,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovePayload {
    pub map_name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub grounded: bool,
}

impl MovePayload {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.yaw.is_finite()
            && self.pitch.is_finite()
    }

    pub fn into_sample(self, player_id: PlayerId) -> MovementSample {
        MovementSample {
            player_id,
            position: Position {
                x: self.x,
                y: self.y,
                z: self.z,
                yaw: self.yaw,
                pitch: self.pitch,
            },
            grounded: self.grounded,
            map_name: self.map_name,
        }
    }
}

/// Round state as exposed by `GET /round` and the post-join message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshotDto {
    pub tick: u64,
    pub phase: String,
    pub map_name: Option<String>,
    pub online_players: usize,
    pub alive_players: Vec<String>,
    pub lobby_countdown: Option<u32>,
}

impl From<&RoundSnapshot> for RoundSnapshotDto {
    fn from(snapshot: &RoundSnapshot) -> Self {
        Self {
            tick: snapshot.tick,
            phase: phase_name(snapshot.phase).to_string(),
            map_name: snapshot.map_name.clone(),
            online_players: snapshot.online_players,
            alive_players: snapshot
                .alive_players
                .iter()
                .map(ToString::to_string)
                .collect(),
            lobby_countdown: snapshot.lobby_countdown,
        }
    }
}

fn phase_name(phase: RoundPhase) -> &'static str {
    match phase {
        RoundPhase::Lobby => "lobby",
        RoundPhase::Protection => "protection",
        RoundPhase::Ingame => "ingame",
        RoundPhase::Ending => "ending",
    }
}

/// Body of `GET /stats/{player_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatsResponse {
    pub player_id: String,
    pub wins: u32,
    pub losses: u32,
    pub best_survival_ms: u64,
    // Position on the wins leaderboard; absent when unranked.
    pub rank: Option<u32>,
}

impl PlayerStatsResponse {
    pub fn new(player_id: PlayerId, stats: PlayerStats, rank: Rank) -> Self {
        Self {
            player_id: player_id.to_string(),
            wins: stats.wins,
            losses: stats.losses,
            best_survival_ms: stats.best_survival_ms,
            rank: match rank {
                Rank::Ranked(position) => Some(position),
                Rank::Unranked => None,
            },
        }
    }
}

/// Body of `POST /countdown/shorten`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub shortened: bool,
}
