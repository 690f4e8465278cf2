//! Telephony media-stream WebSocket handler.
//!
//! The connection acceptor for the relay: upgrades the inbound telephony
//! connection, extracts the call-scoped correlation token, opens the
//! matching upstream session, and drives one `CallRelay` for the life of the
//! connection. The `select!` loop here is the per-session serialization
//! point required by the relay core: one inbound event is handled to
//! completion before the next one for this call is taken, while other calls
//! proceed in parallel on their own tasks.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Interval;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::downstream::events::{DownstreamCommand, StreamEvent};
use crate::core::relay::CallRelay;
use crate::core::upstream::{self, UpstreamSession};
use crate::notify::CallStatus;
use crate::state::AppState;

/// Sub-protocol token the telephony side offers.
const STREAM_SUBPROTOCOL: &str = "audio";

/// Channel buffer size for outbound media frames.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size. Telephony frames are 20 ms of u-law audio
/// plus JSON framing, so 64 KB is generous.
const MAX_WS_FRAME_SIZE: usize = 64 * 1024;

/// Maximum WebSocket message size.
const MAX_WS_MESSAGE_SIZE: usize = 64 * 1024;

/// Query parameters on the stream accept path.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Correlation token associating the call with external business context
    pub lead: Option<String>,
}

/// Media-stream WebSocket handler.
///
/// Accepts connections on the stream path only; all other paths never reach
/// this handler. Sub-protocol negotiation is permissive by default: the
/// `audio` token is selected when offered, and connections that omit it are
/// still accepted unless `require_subprotocol` is set.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let lead_reference = query.lead.unwrap_or_else(|| "unknown".to_string());

    if state.config.require_subprotocol && !offers_stream_subprotocol(&headers) {
        warn!(lead = %lead_reference, "rejecting stream connection without sub-protocol");
        return (StatusCode::BAD_REQUEST, "sub-protocol required").into_response();
    }

    info!(lead = %lead_reference, "media stream connection upgrade requested");

    ws.protocols([STREAM_SUBPROTOCOL])
        .max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream(socket, state, lead_reference))
}

/// Whether any `Sec-WebSocket-Protocol` header offers the stream
/// sub-protocol. The token may arrive in a comma-separated list or in a
/// repeated header of the same name.
fn offers_stream_subprotocol(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| {
            value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case(STREAM_SUBPROTOCOL))
        })
}

/// Drive one call session over an accepted telephony socket.
async fn handle_media_stream(mut socket: WebSocket, state: Arc<AppState>, lead_reference: String) {
    let relay_id = Uuid::new_v4();

    // The upstream connect step is fatal for this call only; the health
    // endpoint and other calls are unaffected.
    let Some(upstream_config) = state.upstream_config() else {
        error!(%relay_id, "no upstream credential configured, refusing media stream");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let UpstreamSession {
        commands: upstream_tx,
        events: mut upstream_events,
    } = match upstream::connect(&upstream_config).await {
        Ok(session) => session,
        Err(e) => {
            error!(%relay_id, "upstream connect failed: {e}");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Sender task for outbound telephony frames. A failed frame is logged
    // and dropped; an audio glitch must not terminate the call.
    let (downstream_tx, mut downstream_rx) = mpsc::channel::<DownstreamCommand>(CHANNEL_BUFFER_SIZE);
    let sender_task = tokio::spawn(async move {
        while let Some(command) = downstream_rx.recv().await {
            match command {
                DownstreamCommand::Event(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            warn!("failed to send media frame: {e}");
                        }
                    }
                    Err(e) => error!("failed to serialize outbound event: {e}"),
                },
                DownstreamCommand::Close => {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut relay = CallRelay::new(
        lead_reference,
        state.commit_policy(),
        upstream_tx,
        downstream_tx,
        state.notifier.clone(),
    );
    relay.configure(&upstream_config).await;

    let mut commit_timer = state.commit_policy().interval.map(tokio::time::interval);
    if let Some(timer) = commit_timer.as_mut() {
        // An interval yields immediately on its first tick.
        timer.tick().await;
    }

    loop {
        tokio::select! {
            msg = ws_stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<StreamEvent>(&text) {
                    Ok(event) => {
                        if !relay.handle_stream_event(event).await {
                            break;
                        }
                    }
                    Err(e) => {
                        // Malformed event: drop it, keep the call alive.
                        warn!(%relay_id, "undecodable telephony event dropped: {e}");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!(%relay_id, "telephony connection closed");
                    relay.handle_downstream_closed().await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%relay_id, "telephony WebSocket error: {e}");
                    relay.handle_downstream_closed().await;
                    break;
                }
            },

            event = upstream_events.recv() => match event {
                Some(event) => {
                    if !relay.handle_upstream_event(event).await {
                        break;
                    }
                }
                None => {
                    relay.teardown(CallStatus::Failed).await;
                    break;
                }
            },

            _ = commit_tick(&mut commit_timer) => relay.handle_commit_tick().await,
        }
    }

    // Backstop; no-op when an event arm already tore the session down.
    relay.teardown(CallStatus::Failed).await;
    let _ = sender_task.await;
    info!(%relay_id, "media stream connection terminated");
}

/// Resolve to the next commit tick, or never when the timer is disabled.
async fn commit_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
