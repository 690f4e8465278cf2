//! voxbridge: a telephony media-stream to realtime speech-model gateway.
//!
//! The gateway accepts a telephony provider's media-stream WebSocket,
//! bridges each call to a realtime speech-model session, and relays audio
//! in both directions without transcoding. When a call ends it posts a
//! summary report to a configured collector endpoint.

pub mod config;
pub mod core;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use state::AppState;
