//! Relay core: per-call state, buffering policy, and the orchestrator.

pub mod orchestrator;
pub mod session;

pub use orchestrator::CallRelay;
pub use session::{CallSession, RelayPhase};

use std::time::Duration;

/// Default number of appended frames that triggers a commit.
pub const DEFAULT_COMMIT_FRAME_THRESHOLD: u32 = 10;

/// Default period of the timer-driven commit safety net.
pub const DEFAULT_COMMIT_INTERVAL_MS: u64 = 1000;

/// Input-buffer commit policy.
///
/// Two mechanisms exist and either can be disabled independently: a frame
/// threshold (commit once N frames were appended since the last commit) and
/// a periodic timer that commits whatever is pending. The default enables
/// both, so un-committed audio has a staleness upper bound of one timer
/// period even if server-side voice activity detection never commits on its
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPolicy {
    /// Commit after this many appended frames; `None` disables
    pub frame_threshold: Option<u32>,
    /// Commit pending frames this often; `None` disables
    pub interval: Option<Duration>,
}

impl CommitPolicy {
    /// Build a policy from raw configuration values; zero disables either
    /// mechanism.
    pub fn new(frame_threshold: u32, interval_ms: u64) -> Self {
        Self {
            frame_threshold: (frame_threshold > 0).then_some(frame_threshold),
            interval: (interval_ms > 0).then(|| Duration::from_millis(interval_ms)),
        }
    }

    /// Whether the pending frame count has reached the commit threshold.
    pub fn threshold_crossed(&self, pending_frames: u32) -> bool {
        self.frame_threshold
            .is_some_and(|threshold| pending_frames >= threshold)
    }
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_COMMIT_FRAME_THRESHOLD, DEFAULT_COMMIT_INTERVAL_MS)
    }
}
