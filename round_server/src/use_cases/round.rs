use super::engine::RoundEngine;
use super::types::{RoundEvent, RoundNotice, RoundSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::info;

/// Drives the round engine: one fixed tick, then every queued event, then publish.
pub async fn round_task(
    mut engine: RoundEngine,
    mut event_rx: mpsc::Receiver<RoundEvent>,
    notice_tx: broadcast::Sender<RoundNotice>,
    snapshot_tx: watch::Sender<RoundSnapshot>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    // Registered up front so a stop request between two ticks is not lost.
    let stop = shutdown.notified();
    tokio::pin!(stop);
    stop.as_mut().enable();
    info!(tick_ms = tick_interval.as_millis() as u64, "round loop started");

    loop {
        tokio::select! {
            _ = &mut stop => {
                break;
            }
            _ = interval.tick() => {}
        }

        engine.tick();

        // Events are applied in arrival order; erosions they schedule land next tick.
        while let Ok(event) = event_rx.try_recv() {
            engine.handle(event);
        }

        for notice in engine.drain_notices() {
            // No receivers just means nobody is connected.
            let _ = notice_tx.send(notice);
        }
        snapshot_tx.send_replace(engine.snapshot());

        if engine.stop_requested() {
            shutdown.notify_waiters();
            break;
        }
    }

    info!("round loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::RoundTuning;
    use crate::use_cases::engine::RoundPorts;
    use crate::use_cases::test_support::{FakeMapRegistry, ManualClock, RecordingStats};
    use crate::use_cases::types::EndAction;
    use tokio::sync::oneshot;
    use uuid::Uuid;

    struct Running {
        event_tx: mpsc::Sender<RoundEvent>,
        notice_rx: broadcast::Receiver<RoundNotice>,
        snapshot_rx: watch::Receiver<RoundSnapshot>,
        shutdown: Arc<Notify>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn_round() -> Running {
        let ports = RoundPorts {
            maps: Arc::new(FakeMapRegistry::desert()),
            stats: Arc::new(RecordingStats::default()),
            clock: Arc::new(ManualClock::at(0)),
        };
        let engine = RoundEngine::new(ports, RoundTuning::default(), EndAction::Shutdown);
        let (event_tx, event_rx) = mpsc::channel(16);
        let (notice_tx, notice_rx) = broadcast::channel(64);
        let (snapshot_tx, snapshot_rx) = watch::channel(RoundSnapshot::default());
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(round_task(
            engine,
            event_rx,
            notice_tx,
            snapshot_tx,
            Duration::from_millis(5),
            shutdown.clone(),
        ));
        Running {
            event_tx,
            notice_rx,
            snapshot_rx,
            shutdown,
            handle,
        }
    }

    #[tokio::test]
    async fn when_players_join_then_snapshot_and_notices_are_published() {
        let mut round = spawn_round();
        let player_id = Uuid::new_v4();

        round
            .event_tx
            .send(RoundEvent::Join {
                player_id,
                display_name: "Alpha".to_string(),
                reply: oneshot::channel().0,
            })
            .await
            .expect("send join");

        let snapshot = round
            .snapshot_rx
            .wait_for(|snapshot| snapshot.online_players == 1)
            .await
            .expect("snapshot published")
            .clone();
        assert_eq!(snapshot.lobby_countdown, None);

        let notice = round.notice_rx.recv().await.expect("join notice");
        assert_eq!(
            notice,
            RoundNotice::PlayerJoined {
                player_id,
                display_name: "Alpha".to_string()
            }
        );

        round.shutdown.notify_waiters();
        round.handle.await.expect("round task join");
    }

    #[tokio::test]
    async fn when_shorten_is_requested_through_channel_then_reply_arrives() {
        let round = spawn_round();
        for name in ["Alpha", "Bravo"] {
            round
                .event_tx
                .send(RoundEvent::Join {
                    player_id: Uuid::new_v4(),
                    display_name: name.to_string(),
                    reply: oneshot::channel().0,
                })
                .await
                .expect("send join");
        }

        let (reply, reply_rx) = oneshot::channel();
        round
            .event_tx
            .send(RoundEvent::ShortenCountdown { reply })
            .await
            .expect("send shorten");

        assert!(reply_rx.await.expect("shorten reply"));
        round.shutdown.notify_waiters();
        round.handle.await.expect("round task join");
    }
}
