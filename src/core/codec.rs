//! Media frame codec.
//!
//! Both wire protocols carry telephony audio as base64 text inside JSON
//! events, so the relay treats a frame as an opaque base64 carrier and never
//! re-encodes it in the hot path. Decoding to raw bytes exists only for
//! callers that need to inspect or synthesize audio.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// An opaque audio payload in the shared wire encoding (base64 text over
/// G.711 u-law frames).
///
/// The payload is a carrier, not a transcoder: a frame received from one
/// side and forwarded to the other is byte-identical after the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaPayload(String);

impl MediaPayload {
    /// Wrap an already base64-encoded payload as received off the wire.
    pub fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    /// Encode raw audio bytes into a wire payload.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(BASE64_STANDARD.encode(data))
    }

    /// Decode the payload back to raw audio bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.0)
    }

    /// The base64 text exactly as it travels on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the payload, yielding the wire text without copying.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MediaPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
