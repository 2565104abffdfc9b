use async_trait::async_trait;

use crate::domain::arena::Arena;
use crate::domain::entities::{PlayerStats, Rank};
use crate::domain::errors::{MapError, StatsError};
use crate::domain::state::{PlayerId, Spawn};

// Port for map lookups used when a round starts and when players join the lobby.
// Calls are synchronous; map data is local.
pub trait MapRegistry: Send + Sync {
    // Configured game maps in insertion order.
    fn list_maps(&self) -> Vec<String>;
    fn waiting_map(&self) -> Option<String>;
    // Builds a fresh arena for the map.
    fn load_map(&self, name: &str) -> Result<Arena, MapError>;
    fn spawn_point(&self, name: &str) -> Option<Spawn>;
    // Elimination height; 0 when unset.
    fn death_height(&self, name: &str) -> i32;
}

// Port for the statistics backing store. Only reached from background tasks and request handlers.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn record_win(&self, player_id: PlayerId) -> Result<(), StatsError>;
    async fn record_loss(&self, player_id: PlayerId) -> Result<(), StatsError>;
    // Keeps the larger of the stored and the new value.
    async fn update_best_survival_time(
        &self,
        player_id: PlayerId,
        survival_ms: u64,
    ) -> Result<(), StatsError>;
    async fn fetch_stats(&self, player_id: PlayerId) -> Result<Option<PlayerStats>, StatsError>;
    async fn fetch_rank(&self, player_id: PlayerId) -> Result<Rank, StatsError>;
}

// Fire-and-forget statistics writes issued from the round loop. Implementations must not block.
pub trait StatsSink: Send + Sync {
    fn record_win(&self, player_id: PlayerId);
    fn record_loss(&self, player_id: PlayerId);
    fn update_best_survival_time(&self, player_id: PlayerId, survival_ms: u64);
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}
