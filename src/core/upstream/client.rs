//! Upstream realtime session connection.
//!
//! `connect` opens the WebSocket to the speech model and spawns one pump
//! task that owns both halves of the stream: it drains a command channel
//! into the sink and decodes inbound frames into domain-level
//! `UpstreamEvent`s. The relay orchestrator talks to the session exclusively
//! through those two channels, so all of its sends stay fire-and-forget.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

use super::UpstreamError;
use super::config::UpstreamConfig;
use super::messages::{ClientEvent, ServerEvent};
use crate::core::codec::MediaPayload;

/// Channel capacity for WebSocket message pumping.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Commands accepted by the connection pump task.
#[derive(Debug)]
pub enum UpstreamCommand {
    /// Serialize and transmit a client event
    Send(ClientEvent),
    /// Close the connection and end the pump task
    Close,
}

/// Domain-level events decoded from the upstream session.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// Agent audio chunk, still in the shared wire encoding
    AudioDelta(MediaPayload),
    /// The in-flight output turn finished
    OutputComplete,
    /// Agent speech transcript chunk
    TranscriptDelta(String),
    /// Text chunk from a text-modality turn
    TextDelta(String),
    /// Application error reported by the session; non-fatal on its own
    ServerError(String),
    /// The connection closed or errored; fatal for the call session
    Closed,
}

impl UpstreamEvent {
    /// Map a decoded server event to the relay's domain, or `None` for kinds
    /// the relay deliberately ignores.
    pub fn from_server(event: ServerEvent) -> Option<Self> {
        match event {
            ServerEvent::AudioDelta { delta, .. } => {
                Some(Self::AudioDelta(MediaPayload::from_encoded(delta)))
            }
            ServerEvent::ResponseDone { .. } => Some(Self::OutputComplete),
            ServerEvent::AudioTranscriptDelta { delta, .. } => Some(Self::TranscriptDelta(delta)),
            ServerEvent::TextDelta { delta, .. } => Some(Self::TextDelta(delta)),
            ServerEvent::Error { error } => Some(Self::ServerError(format!(
                "{}: {}",
                error.error_type, error.message
            ))),
            ServerEvent::SessionCreated { session } => {
                debug!(session_id = %session.id, "upstream session created");
                None
            }
            ServerEvent::Unknown => None,
        }
    }
}

/// Handle to a connected upstream session.
///
/// `commands` feeds the pump task; `events` is consumed by the relay
/// orchestrator's serialized event loop. Dropping the command sender (or
/// sending `Close`) ends the pump task, which closes the socket.
#[derive(Debug)]
pub struct UpstreamSession {
    /// Outbound control message channel
    pub commands: mpsc::Sender<UpstreamCommand>,
    /// Inbound decoded event channel
    pub events: mpsc::Receiver<UpstreamEvent>,
}

/// Open the WebSocket connection to the speech model.
///
/// Fails with `ConnectionFailed` if the transport cannot be established;
/// a rejected handshake (HTTP error status) is surfaced the same way by the
/// underlying client. This is fatal for the call session.
pub async fn connect(config: &UpstreamConfig) -> Result<UpstreamSession, UpstreamError> {
    if config.api_key.is_empty() {
        return Err(UpstreamError::AuthenticationFailed(
            "API key is required".to_string(),
        ));
    }

    let url = config.ws_url();
    let request = http::Request::builder()
        .uri(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("OpenAI-Beta", "realtime=v1")
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", "api.openai.com")
        .body(())
        .map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;

    info!(model = %config.model, "connected to realtime API");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let (command_tx, mut command_rx) = mpsc::channel::<UpstreamCommand>(WS_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<UpstreamEvent>(WS_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(UpstreamCommand::Send(event)) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("failed to serialize client event: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            // A single failed send means the transport is gone.
                            error!("failed to send upstream message: {e}");
                            break;
                        }
                    }
                    Some(UpstreamCommand::Close) | None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                },

                msg = ws_stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => {
                                if let Some(event) = UpstreamEvent::from_server(event)
                                    && event_tx.send(event).await.is_err()
                                {
                                    // Orchestrator is gone; nothing left to relay to.
                                    break;
                                }
                            }
                            Err(e) => {
                                // Malformed event: drop it, keep the session alive.
                                warn!("undecodable upstream event dropped: {e}");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            error!("failed to send pong: {e}");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("upstream connection closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("upstream WebSocket error: {e}");
                        break;
                    }
                    None => break,
                },
            }
        }

        // Either side ending the pump is fatal for the call session.
        let _ = event_tx.send(UpstreamEvent::Closed).await;
        debug!("upstream connection task ended");
    });

    Ok(UpstreamSession {
        commands: command_tx,
        events: event_rx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::upstream::config::RealtimeModel;

    #[tokio::test]
    async fn test_connect_requires_api_key() {
        let config = UpstreamConfig {
            api_key: String::new(),
            model: RealtimeModel::default(),
            voice: Default::default(),
            instructions: String::new(),
            greeting: String::new(),
        };
        match connect(&config).await {
            Err(UpstreamError::AuthenticationFailed(_)) => {}
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_audio_delta_maps_to_payload() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"response.audio.delta","response_id":"r1","delta":"AAEC"}"#,
        )
        .unwrap();
        match UpstreamEvent::from_server(event) {
            Some(UpstreamEvent::AudioDelta(payload)) => {
                assert_eq!(payload.to_bytes().unwrap(), vec![0u8, 1, 2]);
            }
            other => panic!("expected AudioDelta, got {other:?}"),
        }
    }

    #[test]
    fn test_response_done_maps_to_output_complete() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"response.done","response":{"id":"r1","status":"completed"}}"#,
        )
        .unwrap();
        assert_eq!(
            UpstreamEvent::from_server(event),
            Some(UpstreamEvent::OutputComplete)
        );
    }

    #[test]
    fn test_unknown_kind_maps_to_none() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"input_audio_buffer.committed","item_id":"i1"}"#)
                .unwrap();
        assert_eq!(UpstreamEvent::from_server(event), None);
    }
}
