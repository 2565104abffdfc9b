// Use cases layer: round orchestration workflows.

pub mod afk;
pub mod countdown;
pub mod elimination;
pub mod ending;
pub mod engine;
pub mod lobby;
pub mod protection;
pub mod round;
pub mod stats;
pub mod supervisor;
pub mod types;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{RoundEngine, RoundPorts};
pub use round::round_task;
pub use stats::{ChannelStatsSink, spawn_stats_worker};
pub use types::{EndAction, MovementSample, RoundEvent, RoundNotice, RoundSnapshot};
