//! Liveness endpoint.

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// Static liveness confirmation. Unauthenticated, and independent of the
/// upstream credential so the process reports healthy even when calls
/// cannot be bridged.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "voxbridge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
