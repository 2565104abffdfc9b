use crate::domain::PlayerId;
use crate::domain::ports::StatsStore;
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{PlayerStatsResponse, RoundSnapshotDto, ShortenResponse};
use crate::interface_adapters::state::AppState;
use crate::use_cases::RoundEvent;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

pub async fn round_handler(State(state): State<Arc<AppState>>) -> Json<RoundSnapshotDto> {
    // Clone out of the watch before responding; never hold the borrow.
    let snapshot = RoundSnapshotDto::from(&*state.snapshot_rx.borrow());
    Json(snapshot)
}

pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<PlayerId>,
) -> Response {
    let stats = match state.stats_store.fetch_stats(player_id).await {
        Ok(Some(stats)) => stats,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "player has no statistics"),
        Err(error) => {
            warn!(%player_id, %error, "stats lookup failed");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "statistics unavailable");
        }
    };

    match state.stats_store.fetch_rank(player_id).await {
        Ok(rank) => Json(PlayerStatsResponse::new(player_id, stats, rank)).into_response(),
        Err(error) => {
            warn!(%player_id, %error, "rank lookup failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "statistics unavailable")
        }
    }
}

/// Operator "start now": pulls the lobby countdown down to its floor.
pub async fn shorten_countdown_handler(State(state): State<Arc<AppState>>) -> Response {
    let (reply, reply_rx) = oneshot::channel();
    if state
        .event_tx
        .send(RoundEvent::ShortenCountdown { reply })
        .await
        .is_err()
    {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "round is not running");
    }

    match reply_rx.await {
        Ok(true) => {
            info!("lobby countdown shortened by operator");
            Json(ShortenResponse { shortened: true }).into_response()
        }
        Ok(false) => error_response(
            StatusCode::CONFLICT,
            "countdown is not running or already short",
        ),
        Err(_) => error_response(StatusCode::SERVICE_UNAVAILABLE, "round is not running"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::http::ErrorResponse;
    use crate::interface_adapters::maps::{MapsDocument, TomlMapRegistry};
    use crate::use_cases::RoundSnapshot;
    use crate::use_cases::test_support::{FailureFlags, RecordingStore};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::Request,
        routing::{get, post},
    };
    use tokio::sync::{broadcast, mpsc, watch};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        router: Router,
        event_rx: mpsc::Receiver<RoundEvent>,
        snapshot_tx: watch::Sender<RoundSnapshot>,
    }

    fn test_app(store: RecordingStore) -> TestApp {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (notice_bytes_tx, _) = broadcast::channel(8);
        let (snapshot_tx, snapshot_rx) = watch::channel(RoundSnapshot::default());
        let state = Arc::new(AppState {
            event_tx,
            notice_bytes_tx,
            snapshot_rx,
            stats_store: Arc::new(store),
            maps: Arc::new(TomlMapRegistry::with_document(
                std::env::temp_dir().join(format!("round-maps-{}.toml", Uuid::new_v4())),
                MapsDocument::default(),
            )),
        });
        let router = Router::new()
            .route("/round", get(round_handler))
            .route("/stats/{player_id}", get(stats_handler))
            .route("/countdown/shorten", post(shorten_countdown_handler))
            .with_state(state);
        TestApp {
            router,
            event_rx,
            snapshot_tx,
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn shorten_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/countdown/shorten")
            .body(Body::empty())
            .expect("request")
    }

    // Answers the next shorten request the way the round task would.
    fn reply_to_shorten(mut event_rx: mpsc::Receiver<RoundEvent>, outcome: bool) {
        tokio::spawn(async move {
            if let Some(RoundEvent::ShortenCountdown { reply }) = event_rx.recv().await {
                let _ = reply.send(outcome);
            }
        });
    }

    #[tokio::test]
    async fn when_round_is_requested_then_latest_snapshot_is_returned() {
        let app = test_app(RecordingStore::new());
        app.snapshot_tx.send_replace(RoundSnapshot {
            tick: 7,
            online_players: 3,
            lobby_countdown: Some(42),
            ..RoundSnapshot::default()
        });

        let response = app
            .router
            .oneshot(get_request("/round"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: RoundSnapshotDto = body_json(response).await;
        assert_eq!(body.phase, "lobby");
        assert_eq!(body.online_players, 3);
        assert_eq!(body.lobby_countdown, Some(42));
    }

    #[tokio::test]
    async fn when_player_has_stats_then_they_are_returned() {
        let store = RecordingStore::new();
        let player_id = Uuid::new_v4();
        store.record_win(player_id).await.expect("seed win");
        store
            .update_best_survival_time(player_id, 61_000)
            .await
            .expect("seed survival");
        let app = test_app(store);

        let response = app
            .router
            .oneshot(get_request(&format!("/stats/{player_id}")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: PlayerStatsResponse = body_json(response).await;
        assert_eq!(body.wins, 1);
        assert_eq!(body.losses, 0);
        assert_eq!(body.best_survival_ms, 61_000);
    }

    #[tokio::test]
    async fn when_player_never_played_then_stats_are_not_found() {
        let app = test_app(RecordingStore::new());

        let response = app
            .router
            .oneshot(get_request(&format!("/stats/{}", Uuid::new_v4())))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, "player has no statistics");
    }

    #[tokio::test]
    async fn when_stats_backend_fails_then_service_unavailable_is_returned() {
        let store = RecordingStore::new().with_failures(FailureFlags {
            writes: false,
            reads: true,
        });
        let app = test_app(store);

        let response = app
            .router
            .oneshot(get_request(&format!("/stats/{}", Uuid::new_v4())))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn when_player_id_is_not_a_uuid_then_request_is_rejected() {
        let app = test_app(RecordingStore::new());

        let response = app
            .router
            .oneshot(get_request("/stats/not-a-uuid"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn when_round_accepts_shorten_then_ok_is_returned() {
        let app = test_app(RecordingStore::new());
        reply_to_shorten(app.event_rx, true);

        let response = app
            .router
            .oneshot(shorten_request())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: ShortenResponse = body_json(response).await;
        assert!(body.shortened);
    }

    #[tokio::test]
    async fn when_round_rejects_shorten_then_conflict_is_returned() {
        let app = test_app(RecordingStore::new());
        reply_to_shorten(app.event_rx, false);

        let response = app
            .router
            .oneshot(shorten_request())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn when_round_task_is_gone_then_shorten_is_unavailable() {
        let app = test_app(RecordingStore::new());
        drop(app.event_rx);

        let response = app
            .router
            .oneshot(shorten_request())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
