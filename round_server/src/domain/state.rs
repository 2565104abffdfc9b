// Domain-level round state: phase, frozen round configuration, roster and player records.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub type PlayerId = Uuid;

/// The four mutually exclusive stages of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Lobby,
    Protection,
    Ingame,
    Ending,
}

impl RoundPhase {
    /// The phase that must follow this one in the round cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Lobby => Self::Protection,
            Self::Protection => Self::Ingame,
            Self::Ingame => Self::Ending,
            Self::Ending => Self::Lobby,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Adventure,
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Block containing this position.
    pub fn block(&self) -> BlockPos {
        BlockPos {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }

    /// Height level used for elimination. Truncates toward zero, unlike `block`.
    pub fn level(&self) -> i32 {
        self.y.trunc() as i32
    }

    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn below(self) -> Self {
        Self {
            y: self.y - 1,
            ..self
        }
    }
}

/// Configured spawn point of a map, stored as block coordinates plus view angles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spawn {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Spawn {
    /// Teleport target: horizontally centered on the spawn block.
    pub fn center(&self) -> Position {
        Position {
            x: f64::from(self.x) + 0.5,
            y: f64::from(self.y),
            z: f64::from(self.z) + 0.5,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }
}

/// Frozen parameters of the round in progress. Created once at the lobby countdown's end.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundConfig {
    pub map_name: String,
    pub spawn: Spawn,
    pub death_height: i32,
    pub started_at_ms: u64,
}

impl RoundConfig {
    pub fn is_round_map(&self, map_name: &str) -> bool {
        self.map_name.eq_ignore_ascii_case(map_name)
    }

    pub fn survival_millis(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }
}

/// Players still eligible to win the current round.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    alive: HashSet<PlayerId>,
}

impl Roster {
    pub fn seed(&mut self, players: impl IntoIterator<Item = PlayerId>) {
        self.alive.clear();
        self.alive.extend(players);
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.alive.contains(player_id)
    }

    pub fn remove(&mut self, player_id: &PlayerId) -> bool {
        self.alive.remove(player_id)
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// The last player standing, if exactly one remains.
    pub fn sole_survivor(&self) -> Option<PlayerId> {
        if self.alive.len() == 1 {
            self.alive.iter().next().copied()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.alive.clear();
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.alive.iter()
    }
}

/// Single source of truth for the round: phase, roster and frozen configuration.
#[derive(Debug, Default)]
pub struct RoundState {
    phase: RoundPhase,
    pub config: Option<RoundConfig>,
    pub roster: Roster,
}

impl RoundState {
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Moves to the next phase of the cycle. Returns the new phase.
    pub fn advance(&mut self) -> RoundPhase {
        self.phase = self.phase.next();
        self.phase
    }

    /// Forced return to the lobby; drops the round configuration and roster.
    pub fn reset(&mut self) {
        self.phase = RoundPhase::Lobby;
        self.config = None;
        self.roster.clear();
    }
}

/// A connected player as seen by the round engine.
#[derive(Debug, Clone)]
pub struct OnlinePlayer {
    pub id: PlayerId,
    pub display_name: String,
    pub map_name: String,
    pub position: Position,
    pub grounded: bool,
    pub mode: GameMode,
    // Countdown value shown on the player's level bar.
    pub level: u32,
}

impl OnlinePlayer {
    pub fn new(id: PlayerId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            map_name: String::new(),
            position: Position::default(),
            grounded: false,
            mode: GameMode::Adventure,
            level: 0,
        }
    }
}
