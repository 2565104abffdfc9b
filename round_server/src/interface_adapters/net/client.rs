use crate::domain::PlayerId;
use crate::interface_adapters::protocol::{
    ClientMessage, JoinPayload, RoundSnapshotDto, ServerMessage,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{RoundEvent, RoundNotice};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    EventsClosed,
    NoticesClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
    AlreadyConnected,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 64;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serializes each round notice once and fans the shared bytes out to every connection.
pub async fn notice_serializer(
    mut notice_rx: broadcast::Receiver<RoundNotice>,
    notice_bytes_tx: broadcast::Sender<Utf8Bytes>,
) {
    loop {
        match notice_rx.recv().await {
            Ok(notice) => {
                let msg = ServerMessage::Notice(notice);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize round notice");
                        continue;
                    }
                };
                let _ = notice_bytes_tx.send(Utf8Bytes::from(txt));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "notice serializer lagged; notices dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("round notices closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Separate connection id for correlating logs before a player id exists.
    let conn_id = Uuid::new_v4();
    let span = info_span!("conn", %conn_id, player_id = tracing::field::Empty);
    ws.on_upgrade(move |socket| handle_socket(socket, state).instrument(span))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("host disconnected before join handshake");
            return;
        }
        Err(NetError::AlreadyConnected) => {
            warn!("join rejected: player id already connected");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = send_close_with_reason(&mut socket, close_code::POLICY, "bootstrap failed").await;
            return;
        }
    };

    tracing::Span::current().record("player_id", tracing::field::display(ctx.player_id));
    info!(player_id = %ctx.player_id, "player connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    player_id: PlayerId,
    state: Arc<AppState>,
    notice_rx: broadcast::Receiver<Utf8Bytes>,

    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,

    last_events_full_log: Instant,
    last_invalid_log: Instant,
    last_lag_log: Instant,

    close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so no notice after the join is missed.
    let notice_rx = state.notice_bytes_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };
    let player_id = join.player_id;

    match request_join(&state.event_tx, player_id, join.display_name).await {
        Ok(()) => {}
        Err(NetError::AlreadyConnected) => {
            // The live session owns this id; never send a leave on its behalf.
            let _ = send_close_with_reason(socket, close_code::POLICY, "already connected").await;
            return Err(NetError::AlreadyConnected);
        }
        Err(e) => return Err(e),
    }

    let identity = ServerMessage::Identity {
        player_id: player_id.to_string(),
    };
    let snapshot = RoundSnapshotDto::from(&*state.snapshot_rx.borrow());
    let greeting = async {
        send_message(socket, &identity).await?;
        send_message(socket, &ServerMessage::Round(snapshot)).await
    };
    if let Err(e) = greeting.await {
        // Compensate so the engine does not keep a player without a connection.
        let _ = state.event_tx.send(RoundEvent::Leave { player_id }).await;
        return Err(e);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        state: state.clone(),
        notice_rx,
        msgs_in: 1,
        msgs_out: 2,
        invalid_json: 0,
        last_events_full_log: now,
        last_invalid_log: now,
        last_lag_log: now,
        close_frame: None,
    })
}

/// Registers the player with the round task and waits for it to accept the id.
async fn request_join(
    event_tx: &mpsc::Sender<RoundEvent>,
    player_id: PlayerId,
    display_name: String,
) -> Result<(), NetError> {
    let (reply, reply_rx) = oneshot::channel();
    event_tx
        .send(RoundEvent::Join {
            player_id,
            display_name,
            reply,
        })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    match reply_rx.await {
        Ok(true) => Ok(()),
        Ok(false) => Err(NetError::AlreadyConnected),
        Err(_) => Err(NetError::EventsClosed),
    }
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinPayload, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => {
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(ClientMessage::Move(_)) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let display_name = payload.display_name.trim();
                if display_name.is_empty() || display_name.len() > MAX_DISPLAY_NAME_LEN {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid display name")
                            .await;
                    return Err(NetError::JoinRequired);
                }

                return Ok(JoinPayload {
                    player_id: payload.player_id,
                    display_name: display_name.to_string(),
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            notice = ctx.notice_rx.recv() => {
                match notice {
                    Ok(bytes) => match forward_bytes(bytes, socket, &mut ctx.msgs_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_lag_log) {
                            warn!(player_id = %ctx.player_id, missed = n, "notices lagged; resending round state");
                        }
                        // Notices are incremental, so resync with the current snapshot.
                        let snapshot = RoundSnapshotDto::from(&*ctx.state.snapshot_rx.borrow());
                        match send_message(socket, &ServerMessage::Round(snapshot)).await {
                            Ok(_) => {
                                ctx.msgs_out += 1;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send round snapshot");
                                true
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::NoticesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(%player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Move(payload)) => {
                        if !payload.is_finite() {
                            if should_log(&mut ctx.last_invalid_log) {
                                warn!(%player_id, "invalid position values (NaN/inf); dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        let event = RoundEvent::Movement(payload.into_sample(player_id));
                        match ctx.state.event_tx.try_send(event) {
                            Ok(()) => Ok(LoopControl::Continue),
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                if should_log(&mut ctx.last_events_full_log) {
                                    warn!(%player_id, "event channel full; dropping movement");
                                }
                                Ok(LoopControl::Continue)
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::EventsClosed),
                        }
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(
                                %player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse host message"
                            );
                        }
                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(%player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(%player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_bytes(bytes: Utf8Bytes, socket: &mut WebSocket, msgs_out: &mut u64) -> LoopControl {
    match socket.send(Message::Text(bytes)).await {
        Ok(()) => {
            *msgs_out += 1;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send round notice");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    ctx.state
        .event_tx
        .send(RoundEvent::Leave {
            player_id: ctx.player_id,
        })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    debug!(
        player_id = %ctx.player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!(player_id = %ctx.player_id, "player disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // Stands in for the round task: answers joins with `accept` and reports what else arrived.
    fn answer_joins(
        mut event_rx: mpsc::Receiver<RoundEvent>,
        accept: bool,
    ) -> tokio::task::JoinHandle<Vec<RoundEvent>> {
        tokio::spawn(async move {
            let mut others = Vec::new();
            while let Some(event) = event_rx.recv().await {
                match event {
                    RoundEvent::Join { reply, .. } => {
                        let _ = reply.send(accept);
                    }
                    other => others.push(other),
                }
            }
            others
        })
    }

    #[tokio::test]
    async fn when_round_accepts_join_then_request_succeeds() {
        let (event_tx, event_rx) = mpsc::channel(4);
        let round = answer_joins(event_rx, true);

        let result = request_join(&event_tx, Uuid::new_v4(), "Alpha".to_string()).await;

        assert!(result.is_ok());
        drop(event_tx);
        assert!(round.await.expect("round stand-in").is_empty());
    }

    #[tokio::test]
    async fn when_player_id_is_already_connected_then_join_is_rejected_without_leave() {
        let (event_tx, event_rx) = mpsc::channel(4);
        let round = answer_joins(event_rx, false);

        let result = request_join(&event_tx, Uuid::new_v4(), "Impostor".to_string()).await;

        assert!(matches!(result, Err(NetError::AlreadyConnected)));
        drop(event_tx);
        let others = round.await.expect("round stand-in");
        assert!(
            !others
                .iter()
                .any(|event| matches!(event, RoundEvent::Leave { .. })),
            "a rejected join must not evict the connected player"
        );
    }

    #[tokio::test]
    async fn when_round_task_is_gone_then_join_reports_closed_events() {
        let (event_tx, event_rx) = mpsc::channel(4);
        drop(event_rx);

        let result = request_join(&event_tx, Uuid::new_v4(), "Alpha".to_string()).await;

        assert!(matches!(result, Err(NetError::EventsClosed)));
    }
}
