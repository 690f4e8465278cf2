//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::relay::CommitPolicy;
use crate::core::upstream::config::UpstreamConfig;
use crate::notify::Notifier;

/// State shared across handlers. Call sessions never share mutable state;
/// everything here is either immutable configuration or a cloneable handle.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// End-of-call report notifier
    pub notifier: Notifier,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let notifier = match config.notify_url.clone() {
            Some(url) => Notifier::new(Some(url)),
            None => Notifier::disabled(),
        };
        Arc::new(Self { config, notifier })
    }

    /// The commit policy applied to every call session.
    pub fn commit_policy(&self) -> CommitPolicy {
        CommitPolicy::new(
            self.config.commit_frame_threshold,
            self.config.commit_interval_ms,
        )
    }

    /// Per-call upstream configuration, if a credential is available.
    pub fn upstream_config(&self) -> Option<UpstreamConfig> {
        let api_key = self.config.openai_api_key.clone()?;
        Some(UpstreamConfig {
            api_key,
            model: self.config.realtime_model,
            voice: self.config.voice,
            instructions: self.config.instructions.clone(),
            greeting: self.config.greeting.clone(),
        })
    }
}
