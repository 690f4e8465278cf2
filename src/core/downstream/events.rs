//! Telephony media-stream wire protocol.

use serde::{Deserialize, Serialize};

use crate::core::codec::MediaPayload;
use crate::core::upstream::config::TELEPHONY_SAMPLE_RATE;

/// Inbound events from the telephony media stream.
///
/// Dispatched on the `event` field. Kinds the relay does not act on
/// (`connected`, `mark`, anything unrecognized) deserialize successfully and
/// are ignored, so a protocol addition never kills a live call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Transport-level hello, sent before `start`
    Connected,
    /// Stream start: carries the call identifiers and negotiated format
    Start {
        /// Start metadata
        start: StartMeta,
    },
    /// One audio frame from the caller
    Media {
        /// Frame payload
        media: MediaFrame,
    },
    /// Playback checkpoint echo; not used by the relay
    Mark,
    /// End of the call
    Stop,
    /// Any event kind this relay does not act on
    #[serde(other)]
    Unknown,
}

/// Metadata from the `start` event.
#[derive(Debug, Clone, Deserialize)]
pub struct StartMeta {
    /// Stream identifier, required to address outbound media frames
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// Call identifier assigned by the telephony side
    #[serde(rename = "callSid")]
    pub call_sid: String,
    /// Negotiated media format
    #[serde(rename = "mediaFormat")]
    pub media_format: MediaFormat,
}

/// Negotiated media format from the `start` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFormat {
    /// Audio encoding name
    pub encoding: String,
    /// Sample rate in Hz
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    /// Channel count
    pub channels: u32,
}

impl MediaFormat {
    /// Whether the stream matches the one encoding this gateway speaks.
    /// A mismatch is a configuration error, fatal for the call, since no
    /// transcoding exists anywhere in the relay.
    pub fn is_telephony_encoding(&self) -> bool {
        self.encoding.eq_ignore_ascii_case("audio/x-mulaw")
            && self.sample_rate == TELEPHONY_SAMPLE_RATE
            && self.channels == 1
    }
}

/// Payload of an inbound `media` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFrame {
    /// Opaque wire-encoded audio
    pub payload: MediaPayload,
}

/// Outbound events toward the telephony side.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundStreamEvent {
    /// One agent audio frame
    Media {
        /// Stream this frame belongs to
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Frame payload
        media: OutboundMedia,
    },
}

impl OutboundStreamEvent {
    /// Build an outbound media frame for the given stream.
    pub fn media(stream_sid: String, payload: MediaPayload) -> Self {
        Self::Media {
            stream_sid,
            media: OutboundMedia { payload },
        }
    }
}

/// Payload wrapper for outbound media events.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMedia {
    /// Opaque wire-encoded audio
    pub payload: MediaPayload,
}

/// Commands accepted by the downstream sender task.
#[derive(Debug)]
pub enum DownstreamCommand {
    /// Serialize and transmit an outbound event
    Event(OutboundStreamEvent),
    /// Close the connection and end the sender task
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_deserialization() {
        let json = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "accountSid": "AC000",
                "streamSid": "MZ123",
                "callSid": "CA123",
                "tracks": ["inbound"],
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            },
            "streamSid": "MZ123"
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Start { start } => {
                assert_eq!(start.call_sid, "CA123");
                assert_eq!(start.stream_sid, "MZ123");
                assert!(start.media_format.is_telephony_encoding());
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_media_event_deserialization() {
        let json = r#"{
            "event": "media",
            "sequenceNumber": "4",
            "media": {"track": "inbound", "chunk": "2", "timestamp": "80", "payload": "AAEC"},
            "streamSid": "MZ123"
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Media { media } => assert_eq!(media.payload.as_str(), "AAEC"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_stop_event_ignores_body() {
        let json = r#"{"event": "stop", "stop": {"callSid": "CA123"}, "streamSid": "MZ123"}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, StreamEvent::Stop));
    }

    #[test]
    fn test_unknown_event_kind_is_ignored() {
        let json = r#"{"event": "dtmf", "dtmf": {"digit": "5"}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, StreamEvent::Unknown));
    }

    #[test]
    fn test_format_mismatch_detected() {
        let format = MediaFormat {
            encoding: "audio/l16".to_string(),
            sample_rate: 16000,
            channels: 1,
        };
        assert!(!format.is_telephony_encoding());
    }

    #[test]
    fn test_outbound_media_serialization() {
        let event =
            OutboundStreamEvent::media("MZ123".to_string(), MediaPayload::from_bytes(&[1, 2, 3]));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"media""#));
        assert!(json.contains(r#""streamSid":"MZ123""#));
        assert!(json.contains(r#""payload":"AQID""#));
    }
}
