//! Upstream session client.
//!
//! Owns the single streaming connection to the speech model for one call:
//! connection lifecycle, outbound control messages, and inbound event
//! decoding. One upstream session exists per call session, with a matched
//! lifetime.

pub mod client;
pub mod config;
pub mod messages;

pub use client::{UpstreamCommand, UpstreamEvent, UpstreamSession, connect};
pub use config::{
    REALTIME_URL, RealtimeModel, RealtimeVoice, TELEPHONY_AUDIO_FORMAT, TELEPHONY_SAMPLE_RATE,
    UpstreamConfig,
};
pub use messages::{ClientEvent, ResponseConfig, ServerEvent, SessionConfig, TurnDetection};

/// Errors from the upstream session client.
///
/// Transport-level failures are fatal for the owning call session and are
/// never retried within its lifetime; the caller must redial to get a new
/// session.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection to the speech model failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected or no credential is configured
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}
