use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use podium_api::{AppState, claims, leaderboard};
use podium_types::events::{GatewayCommand, GatewayEvent};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One connected subscriber. On connect the current ranking is pushed
/// immediately (computed fresh, not cached), then the loop forwards
/// broadcasts until the client goes away. Inbound SubmitClaim commands
/// funnel into the same claim processor as the HTTP route; their results
/// and errors come back on this connection only.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, receiver) = socket.split();

    info!("subscriber connected ({} active)", state.dispatcher.subscriber_count() + 1);

    // Subscribe before reading the snapshot: a claim that lands while the
    // snapshot is being computed or sent is then queued behind it rather
    // than lost. Queued events are strictly newer than the snapshot, so
    // the client converges either way.
    let mut broadcast_rx = state.dispatcher.subscribe();

    // Initial snapshot so a new subscriber is not left blank until the
    // next claim.
    match leaderboard::current_ranking(&state).await {
        Ok(entries) => {
            let event = GatewayEvent::LeaderboardUpdate { entries };
            if send_event(&mut sender, &event).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!("failed to compute initial ranking: {}", e);
            return;
        }
    }

    // Direct channel for this connection's own claim results and errors.
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward broadcasts + direct replies -> client, with heartbeat.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("subscriber lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                result = direct_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };

                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the client.
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        read_commands(receiver, recv_state, direct_tx, pong_flag_recv).await;
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("subscriber disconnected");
}

async fn read_commands(
    mut receiver: SplitStream<WebSocket>,
    state: AppState,
    direct_tx: mpsc::UnboundedSender<GatewayEvent>,
    pong_flag: Arc<AtomicBool>,
) {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                Ok(GatewayCommand::SubmitClaim { user_id }) => {
                    let reply = handle_submit_claim(&state, &user_id).await;
                    if direct_tx.send(reply).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        "bad command: {} -- raw: {}",
                        e,
                        truncate_for_log(&text, 200)
                    );
                }
            },
            Message::Pong(_) => {
                pong_flag.store(true, Ordering::Release);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Run a socket-submitted claim through the shared processor. The outcome
/// (success or failure) is turned into a direct event for the submitting
/// connection; failures are never broadcast.
async fn handle_submit_claim(state: &AppState, raw_user_id: &str) -> GatewayEvent {
    let result = match claims::parse_user_id(raw_user_id) {
        Ok(user_id) => claims::process_claim(state, user_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => GatewayEvent::ClaimResult {
            user_id: outcome.user.id,
            name: outcome.user.name,
            earned: outcome.earned,
            total_points: outcome.user.total_points,
            history_id: outcome.record.id,
        },
        Err(e) => GatewayEvent::ClaimError {
            code: e.code().to_string(),
            message: e.public_message(),
        },
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap();
    sender.send(Message::Text(text.into())).await
}

/// Cap a log sample at `max` bytes without splitting a multibyte
/// character. Frames are client-controlled, so a plain byte slice here
/// would be a remotely triggerable panic.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
