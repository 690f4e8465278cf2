//! Media-stream WebSocket route configuration
//!
//! This module configures the WebSocket endpoint where the telephony
//! provider delivers call audio.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream?lead=<reference>` - WebSocket upgrade for a call's
/// bidirectional audio stream
///
/// # Protocol
///
/// After the upgrade the telephony side sends JSON control events tagged on
/// `event` (`connected`, `start`, `media`, `stop`, `mark`) with audio carried
/// as base64 u-law inside `media` events. The gateway sends `media` events
/// back on the same socket, addressed by the stream identifier from `start`.
///
/// # Query parameters
///
/// `lead` carries the correlation token that ties the call to external
/// business context; it defaults to `"unknown"` when absent.
pub fn create_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
