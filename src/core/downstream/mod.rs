//! Downstream telephony stream types.
//!
//! The telephony side delivers call lifecycle and audio frames as
//! JSON-framed events over the accepted WebSocket; outbound audio travels
//! the same way. Event decoding is an exhaustive tagged match over the
//! closed set of kinds the relay acts on, with unrecognized kinds ignored.

pub mod events;

pub use events::{
    DownstreamCommand, MediaFormat, MediaFrame, OutboundMedia, OutboundStreamEvent, StartMeta,
    StreamEvent,
};
