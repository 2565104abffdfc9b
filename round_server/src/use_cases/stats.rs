// Fire-and-forget statistics: the round loop sends commands, a background task applies them.

use crate::domain::PlayerId;
use crate::domain::ports::{StatsSink, StatsStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsCommand {
    RecordWin(PlayerId),
    RecordLoss(PlayerId),
    BestSurvival(PlayerId, u64),
}

/// Statistics sink backed by an unbounded channel; sending never blocks the round loop.
#[derive(Debug, Clone)]
pub struct ChannelStatsSink {
    tx: mpsc::UnboundedSender<StatsCommand>,
}

impl ChannelStatsSink {
    pub fn new(tx: mpsc::UnboundedSender<StatsCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: StatsCommand) {
        if self.tx.send(command).is_err() {
            warn!(?command, "stats worker gone; update dropped");
        }
    }
}

impl StatsSink for ChannelStatsSink {
    fn record_win(&self, player_id: PlayerId) {
        self.send(StatsCommand::RecordWin(player_id));
    }

    fn record_loss(&self, player_id: PlayerId) {
        self.send(StatsCommand::RecordLoss(player_id));
    }

    fn update_best_survival_time(&self, player_id: PlayerId, survival_ms: u64) {
        self.send(StatsCommand::BestSurvival(player_id, survival_ms));
    }
}

/// Spawns the background writer and returns the sink the engine should use.
pub fn spawn_stats_worker(store: Arc<dyn StatsStore>) -> (ChannelStatsSink, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(stats_task(rx, store));
    (ChannelStatsSink::new(tx), handle)
}

/// Applies statistics commands in order until every sender is dropped.
pub async fn stats_task(mut rx: mpsc::UnboundedReceiver<StatsCommand>, store: Arc<dyn StatsStore>) {
    while let Some(command) = rx.recv().await {
        let result = match command {
            StatsCommand::RecordWin(player_id) => store.record_win(player_id).await,
            StatsCommand::RecordLoss(player_id) => store.record_loss(player_id).await,
            StatsCommand::BestSurvival(player_id, survival_ms) => {
                store
                    .update_best_survival_time(player_id, survival_ms)
                    .await
            }
        };

        match result {
            Ok(()) => debug!(?command, "stats updated"),
            // Gameplay never depends on statistics.
            Err(error) => warn!(?command, %error, "stats update failed"),
        }
    }
    debug!("stats worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{FailureFlags, RecordingStore};
    use uuid::Uuid;

    #[tokio::test]
    async fn when_commands_are_sent_then_worker_applies_them_in_order() {
        let store = RecordingStore::new();
        let (sink, handle) = spawn_stats_worker(Arc::new(store.clone()));
        let player = Uuid::new_v4();

        sink.record_loss(player);
        sink.update_best_survival_time(player, 12_000);
        sink.record_win(player);
        sink.update_best_survival_time(player, 8_000);
        drop(sink);
        handle.await.expect("stats worker join");

        let row = store.row(player).expect("row written");
        assert_eq!(row.wins, 1);
        assert_eq!(row.losses, 1);
        assert_eq!(row.best_survival_ms, 12_000);
    }

    #[tokio::test]
    async fn when_backend_fails_then_worker_keeps_running() {
        let store = RecordingStore::new().with_failures(FailureFlags {
            writes: true,
            reads: false,
        });
        let (sink, handle) = spawn_stats_worker(Arc::new(store.clone()));
        let player = Uuid::new_v4();

        sink.record_loss(player);
        sink.record_win(player);
        drop(sink);

        handle.await.expect("worker exits cleanly");
        assert!(store.row(player).is_none());
    }

    #[tokio::test]
    async fn when_worker_is_gone_then_sending_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelStatsSink::new(tx);

        sink.record_win(Uuid::new_v4());
    }
}
