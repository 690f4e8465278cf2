//! Per-call session state.

use time::OffsetDateTime;

/// Lifecycle phase of a call session.
///
/// `Closed` is terminal; it is reachable from every other phase on error or
/// explicit close from either side, and re-entry is not possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    /// Upstream connection being established
    Connecting,
    /// Session configuration handshake in flight
    Configuring,
    /// Audio relaying in both directions
    Active,
    /// Stop observed, final summary turn requested
    WrappingUp,
    /// Both connections released; terminal
    Closed,
}

impl std::fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Configuring => "configuring",
            Self::Active => "active",
            Self::WrappingUp => "wrapping-up",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// State for one call, created on connection accept and destroyed on full
/// teardown.
///
/// Every field here is mutated only from the orchestrator's serialized event
/// loop; nothing is shared across tasks.
#[derive(Debug)]
pub struct CallSession {
    /// Correlation token parsed from the connection's request target
    pub lead_reference: String,
    /// Call identifier from the telephony `start` event
    pub call_id: Option<String>,
    /// Stream identifier needed to address outbound media frames
    pub stream_sid: Option<String>,
    /// Gates all audio forwarding toward the upstream session
    pub upstream_ready: bool,
    /// True between an audio-output-start and output-complete (or cancel)
    pub agent_speaking: bool,
    /// Suppresses further outbound sends once the telephony side closed
    pub downstream_closed: bool,
    /// Frames appended since the last input-buffer commit
    pub pending_input_frames: u32,
    /// When the connection was accepted
    pub call_started_at: OffsetDateTime,
    /// When the stop/end event was observed
    pub call_ended_at: Option<OffsetDateTime>,
    /// Agent speech transcript, appended from transcript deltas
    pub accumulated_transcript: String,
    /// Summary text, appended from text deltas
    pub accumulated_summary: String,
}

impl CallSession {
    /// Create session state for a freshly accepted connection.
    pub fn new(lead_reference: String) -> Self {
        Self {
            lead_reference,
            call_id: None,
            stream_sid: None,
            upstream_ready: false,
            agent_speaking: false,
            downstream_closed: false,
            pending_input_frames: 0,
            call_started_at: OffsetDateTime::now_utc(),
            call_ended_at: None,
            accumulated_transcript: String::new(),
            accumulated_summary: String::new(),
        }
    }
}
