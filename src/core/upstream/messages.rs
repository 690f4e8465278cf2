//! Realtime API WebSocket message types.
//!
//! Client and server event types for the speech-model session. All events
//! are JSON-encoded and sent over WebSocket.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure the session
//! - input_audio_buffer.append - Append caller audio to the input buffer
//! - input_audio_buffer.commit - Commit the input buffer
//! - response.create - Request a generation turn
//! - response.cancel - Cancel the in-flight response
//!
//! Server events (consumed):
//! - response.audio.delta - Agent audio chunk
//! - response.done - Output turn complete
//! - response.audio_transcript.delta - Agent transcript chunk
//! - response.text.delta - Text chunk (summary turns)
//! - error - Application error
//!
//! All other server event kinds deserialize into `ServerEvent::Unknown` and
//! are deliberately ignored for forward compatibility.

use serde::{Deserialize, Serialize};

use crate::core::codec::MediaPayload;

/// Session configuration sent in a `session.update` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

/// Per-turn configuration for a `response.create` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities for this turn only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    /// One-off instructions for this turn only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Client events sent to the realtime session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a generation turn
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Per-turn configuration
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },

    /// Cancel the in-flight response
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    /// Create an audio append event from a wire payload. The payload text is
    /// carried through untouched.
    pub fn audio_append(payload: MediaPayload) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload.into_inner(),
        }
    }

    /// Create a generation request with one-off instructions.
    pub fn response_with_instructions(instructions: String, modalities: Option<Vec<String>>) -> Self {
        ClientEvent::ResponseCreate {
            response: Some(ResponseConfig {
                modalities,
                instructions: Some(instructions),
            }),
        }
    }
}

/// Server events received from the realtime session.
///
/// Only the kinds the relay acts on are enumerated; everything else lands in
/// `Unknown` and is ignored rather than treated as a decode failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Application error reported by the session
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created acknowledgment
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: SessionInfo,
    },

    /// Agent audio chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Response ID
        response_id: String,
        /// Base64-encoded audio delta
        delta: String,
    },

    /// Agent transcript chunk
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        /// Response ID
        response_id: String,
        /// Transcript delta
        delta: String,
    },

    /// Text chunk (summary turns run with text modality)
    #[serde(rename = "response.text.delta")]
    TextDelta {
        /// Response ID
        response_id: String,
        /// Text delta
        delta: String,
    },

    /// Output turn complete
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response information
        response: ResponseInfo,
    },

    /// Any event kind this relay does not act on
    #[serde(other)]
    Unknown,
}

/// API error information.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

/// Session information from `session.created`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    pub id: String,
    /// Model in use
    #[serde(default)]
    pub model: Option<String>,
}

/// Response information from `response.done`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInfo {
    /// Response ID
    pub id: String,
    /// Response status
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_serialization() {
        let event = ClientEvent::InputAudioBufferCommit;
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("input_audio_buffer.commit"));
    }

    #[test]
    fn test_cancel_serialization() {
        let event = ClientEvent::ResponseCancel;
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("response.cancel"));
    }

    #[test]
    fn test_audio_append_carries_payload_through() {
        let payload = MediaPayload::from_bytes(&[0u8, 1, 2, 3]);
        let wire_text = payload.as_str().to_string();
        let event = ClientEvent::audio_append(payload);
        match event {
            ClientEvent::InputAudioBufferAppend { audio } => assert_eq!(audio, wire_text),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_session_update_serialization() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: Some(vec!["text".to_string(), "audio".to_string()]),
                instructions: Some("Be helpful".to_string()),
                voice: Some("alloy".to_string()),
                input_audio_format: Some("g711_ulaw".to_string()),
                output_audio_format: Some("g711_ulaw".to_string()),
                turn_detection: Some(TurnDetection::ServerVad {
                    threshold: None,
                    prefix_padding_ms: None,
                    silence_duration_ms: None,
                }),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("session.update"));
        assert!(json.contains("g711_ulaw"));
        assert!(json.contains("server_vad"));
    }

    #[test]
    fn test_response_create_omits_empty_config() {
        let event = ClientEvent::ResponseCreate { response: None };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"response.create"}"#);
    }

    #[test]
    fn test_error_event_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {
                "type": "invalid_request_error",
                "message": "Test error"
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::Error { error } => assert_eq!(error.message, "Test error"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_audio_delta_deserialization_ignores_extra_fields() {
        let json = r#"{
            "type": "response.audio.delta",
            "response_id": "resp_1",
            "item_id": "item_1",
            "output_index": 0,
            "content_index": 0,
            "delta": "dGVzdA=="
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::AudioDelta { delta, response_id } => {
                assert_eq!(delta, "dGVzdA==");
                assert_eq!(response_id, "resp_1");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_unrecognized_kind_is_ignored_not_an_error() {
        let json = r#"{"type": "rate_limits.updated", "rate_limits": []}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
    }
}
