use crate::domain::PlayerId;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::ClientPacket;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::throttle::{log_epoch, should_log};
use crate::use_cases::{GameEvent, JoinError, Joined};

use axum::{
    Error, Json,
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    InputClosed,
    JoinRejected(JoinError),
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct JoinQuery {
    // Identity from the upstream session layer; the server picks one if absent.
    #[serde(default)]
    player_id: Option<String>,
}

fn next_conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<JoinQuery>,
) -> impl IntoResponse {
    let requested_id = match query.player_id.as_deref().map(str::parse::<PlayerId>) {
        None => None,
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "player_id must be an integer in 0..=65535".to_string(),
                }),
            )
                .into_response();
        }
    };

    // Separate connection id for correlating logs before/after a player_id exists.
    let span = info_span!("conn", conn_id = next_conn_id(), player_id = tracing::field::Empty);
    ws.on_upgrade(move |socket| handle_socket(socket, state, requested_id).instrument(span))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, requested_id: Option<PlayerId>) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, requested_id).await {
        Ok(ctx) => ctx,
        Err(NetError::JoinRejected(reason)) => {
            info!(?reason, ?requested_id, "join rejected");
            let reason = match reason {
                JoinError::IdInUse(_) => "player id in use",
                JoinError::IdsExhausted => "server full",
            };
            send_close(&mut socket, close_code::POLICY, reason).await;
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            send_close(&mut socket, close_code::ERROR, "bootstrap failed").await;
            return;
        }
    };

    Span::current().record("player_id", ctx.player_id);
    info!("client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
    let _ = socket.close().await;
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub input_tx: mpsc::Sender<GameEvent>,
    // Packets published to this connection by the world task.
    pub outbound_rx: mpsc::Receiver<Bytes>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_packets: u32,

    pub last_input_full_log: Instant,
    pub last_invalid_packet_log: Instant,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    requested_id: Option<PlayerId>,
) -> Result<ConnCtx, NetError> {
    // The queue exists before the join so nothing published after it is lost.
    let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(state.outbound_channel_capacity);
    let (reply_tx, reply_rx) = oneshot::channel();

    state
        .input_tx
        .send(GameEvent::Join {
            requested_id,
            outbound: outbound_tx,
            reply: reply_tx,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let Joined {
        player_id,
        snapshot,
    } = reply_rx
        .await
        .map_err(|_| NetError::InputClosed)?
        .map_err(NetError::JoinRejected)?;

    // The snapshot goes out before anything queued on the outbound channel.
    let mut bytes_out = 0;
    for frame in &snapshot {
        bytes_out += frame.len() as u64;
        if let Err(e) = socket.send(Message::Binary(frame.clone())).await {
            // Compensate with Leave so the player does not linger.
            state
                .input_tx
                .send(GameEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
            return Err(NetError::Ws(e));
        }
    }
    debug!(player_id, frames = snapshot.len(), "snapshot sent");

    let now = log_epoch();
    Ok(ConnCtx {
        player_id,
        input_tx: state.input_tx.clone(),
        outbound_rx,

        msgs_in: 0,
        msgs_out: snapshot.len() as u64,
        bytes_in: 0,
        bytes_out,

        invalid_packets: 0,

        last_input_full_log: now,
        last_invalid_packet_log: now,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
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

            // Outgoing published packet
            outgoing = ctx.outbound_rx.recv() => {
                match outgoing {
                    Some(bytes) => match forward_packet(bytes, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        // The world task dropped our queue.
                        warn!("outbound queue closed; disconnecting");
                        true
                    }
                }
            }
        };

        if disconnect {
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
            Message::Binary(bytes) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += bytes.len() as u64;

                match ClientPacket::decode(&bytes) {
                    Ok(packet) => forward_input(ctx, packet),
                    Err(e) => {
                        // Protocol violations are dropped; the connection stays up.
                        ctx.invalid_packets += 1;
                        if should_log(&mut ctx.last_invalid_packet_log) {
                            warn!(
                                player_id,
                                bytes = bytes.len(),
                                error = %e,
                                invalid = ctx.invalid_packets,
                                "failed to decode client packet"
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Text(text) => {
                ctx.invalid_packets += 1;
                if should_log(&mut ctx.last_invalid_packet_log) {
                    warn!(player_id, bytes = text.len(), "text message ignored");
                }
                Ok(LoopControl::Continue)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            // Abrupt drops take the same teardown path as a clean close.
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

fn forward_input(ctx: &mut ConnCtx, packet: ClientPacket) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match ctx
        .input_tx
        .try_send(GameEvent::Packet { player_id, packet })
    {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(player_id, "input channel full; dropping packet");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn forward_packet(bytes: Bytes, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Binary(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send packet");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    ctx.input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_packets = ctx.invalid_packets,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}
