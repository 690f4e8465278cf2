//! Configuration module for the voxbridge gateway.
//!
//! Configuration comes from environment variables, with `.env` files loaded
//! by the binary before this module runs. The upstream credential is
//! deliberately optional at startup: without it every call's upstream
//! connect fails, but the health endpoint stays available.

use crate::core::relay::{DEFAULT_COMMIT_FRAME_THRESHOLD, DEFAULT_COMMIT_INTERVAL_MS};
use crate::core::upstream::config::{RealtimeModel, RealtimeVoice};

/// Default behavioral instructions for the agent session.
const DEFAULT_INSTRUCTIONS: &str = "You are a friendly phone agent. Keep answers short and \
     conversational; you are speaking, not writing.";

/// Default one-off instructions for the greeting turn.
const DEFAULT_GREETING: &str = "Greet the caller warmly and ask how you can help.";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host (HOST, default "0.0.0.0")
    pub host: String,
    /// Bind port (PORT, default 8080)
    pub port: u16,

    /// Credential for the upstream speech-model connection (OPENAI_API_KEY).
    /// Absence fails each call's upstream connect, not process startup.
    pub openai_api_key: Option<String>,
    /// Realtime model (OPENAI_REALTIME_MODEL)
    pub realtime_model: RealtimeModel,
    /// Agent voice (AGENT_VOICE)
    pub voice: RealtimeVoice,
    /// Behavioral instructions for the session (AGENT_INSTRUCTIONS)
    pub instructions: String,
    /// One-off instructions for the greeting turn (AGENT_GREETING)
    pub greeting: String,

    /// Collector endpoint for end-of-call reports (NOTIFY_URL); reports are
    /// dropped when unset
    pub notify_url: Option<String>,

    /// Frames per input-buffer commit (COMMIT_FRAME_THRESHOLD, 0 disables)
    pub commit_frame_threshold: u32,
    /// Period of the timer-driven commit in ms (COMMIT_INTERVAL_MS, 0 disables)
    pub commit_interval_ms: u64,

    /// Reject connections that do not offer the stream sub-protocol
    /// (REQUIRE_STREAM_SUBPROTOCOL, default false: accept permissively)
    pub require_subprotocol: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            host: env_string("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("PORT", 8080)?,
            openai_api_key: env_string("OPENAI_API_KEY"),
            realtime_model: env_string("OPENAI_REALTIME_MODEL")
                .map(|s| RealtimeModel::from_str_or_default(&s))
                .unwrap_or_default(),
            voice: env_string("AGENT_VOICE")
                .map(|s| RealtimeVoice::from_str_or_default(&s))
                .unwrap_or_default(),
            instructions: env_string("AGENT_INSTRUCTIONS")
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            greeting: env_string("AGENT_GREETING").unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            notify_url: env_string("NOTIFY_URL"),
            commit_frame_threshold: env_parse(
                "COMMIT_FRAME_THRESHOLD",
                DEFAULT_COMMIT_FRAME_THRESHOLD,
            )?,
            commit_interval_ms: env_parse("COMMIT_INTERVAL_MS", DEFAULT_COMMIT_INTERVAL_MS)?,
            require_subprotocol: env_bool("REQUIRE_STREAM_SUBPROTOCOL", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commit_frame_threshold == 0 && self.commit_interval_ms == 0 {
            // Without either mechanism, caller audio would sit in the input
            // buffer forever unless server VAD happens to commit it.
            return Err(ConfigError::InvalidValue {
                var: "COMMIT_FRAME_THRESHOLD",
                reason: "threshold and timer commits cannot both be disabled".to_string(),
            });
        }
        Ok(())
    }

    /// The socket address string to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Zeroize the upstream credential when the config is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

fn env_string(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_string(var) {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            var,
            reason: format!("{e}"),
        }),
        None => Ok(default),
    }
}

fn env_bool(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_string(var) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                var,
                reason: format!("expected a boolean, got {other:?}"),
            }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "HOST",
            "PORT",
            "OPENAI_API_KEY",
            "OPENAI_REALTIME_MODEL",
            "AGENT_VOICE",
            "AGENT_INSTRUCTIONS",
            "AGENT_GREETING",
            "NOTIFY_URL",
            "COMMIT_FRAME_THRESHOLD",
            "COMMIT_INTERVAL_MS",
            "REQUIRE_STREAM_SUBPROTOCOL",
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.realtime_model, RealtimeModel::Gpt4oRealtimePreview);
        assert_eq!(config.voice, RealtimeVoice::Alloy);
        assert_eq!(config.commit_frame_threshold, DEFAULT_COMMIT_FRAME_THRESHOLD);
        assert_eq!(config.commit_interval_ms, DEFAULT_COMMIT_INTERVAL_MS);
        assert!(!config.require_subprotocol);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("PORT", "9090");
            std::env::set_var("AGENT_VOICE", "shimmer");
            std::env::set_var("REQUIRE_STREAM_SUBPROTOCOL", "true");
            std::env::set_var("COMMIT_FRAME_THRESHOLD", "5");
        }
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.voice, RealtimeVoice::Shimmer);
        assert!(config.require_subprotocol);
        assert_eq!(config.commit_frame_threshold, 5);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_rejected() {
        clear_env();
        unsafe { std::env::set_var("PORT", "not-a-port") };
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidValue { var: "PORT", .. })
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_both_commit_mechanisms_disabled_is_rejected() {
        clear_env();
        unsafe {
            std::env::set_var("COMMIT_FRAME_THRESHOLD", "0");
            std::env::set_var("COMMIT_INTERVAL_MS", "0");
        }
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_bool_is_rejected() {
        clear_env();
        unsafe { std::env::set_var("REQUIRE_STREAM_SUBPROTOCOL", "maybe") };
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }
}
