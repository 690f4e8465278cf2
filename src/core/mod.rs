pub mod codec;
pub mod downstream;
pub mod relay;
pub mod upstream;

// Re-export commonly used types for convenience
pub use codec::MediaPayload;
pub use downstream::{DownstreamCommand, OutboundStreamEvent, StreamEvent};
pub use relay::{CallRelay, CallSession, CommitPolicy, RelayPhase};
pub use upstream::{
    ClientEvent, RealtimeModel, RealtimeVoice, UpstreamCommand, UpstreamConfig, UpstreamError,
    UpstreamEvent, UpstreamSession,
};
