use crate::domain::ports::StatsStore;
use crate::interface_adapters::maps::TomlMapRegistry;
use crate::use_cases::{RoundEvent, RoundSnapshot};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Events flowing from connections and operator routes into the round task.
    pub event_tx: mpsc::Sender<RoundEvent>,
    // Serialized notices, shared across all connections.
    pub notice_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Snapshot published by the round task after every tick.
    pub snapshot_rx: watch::Receiver<RoundSnapshot>,
    // Statistics reads for the lookup route.
    pub stats_store: Arc<dyn StatsStore>,
    // Same registry the round engine reads; operator edits land in the next round.
    pub maps: Arc<TomlMapRegistry>,
}
