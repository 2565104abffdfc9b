// Domain layer: core round types and rules.

pub mod arena;
pub mod entities;
pub mod errors;
pub mod ports;
pub mod state;
pub mod tuning;

pub use arena::{Arena, Block, FloorLayer};
pub use entities::{PlayerStats, Rank};
pub use state::{
    BlockPos, GameMode, OnlinePlayer, PlayerId, Position, RoundConfig, RoundPhase, RoundState,
    Roster, Spawn,
};
