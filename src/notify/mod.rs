//! End-of-call report delivery.
//!
//! The relay emits one structured report per call to an external collector.
//! Delivery is fire-and-forget: it is spawned off the call's event loop, and
//! a failure is logged without ever affecting teardown, which has already
//! begun by the time the report exists.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::Url;

/// Final disposition of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The telephony side signalled a normal end of call
    Completed,
    /// Either connection dropped or errored before a normal end
    Failed,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// The end-of-call report record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReport {
    /// Correlation token supplied at connection time
    pub lead_reference: String,
    /// Call identifier from the telephony side, if the call ever started
    pub call_id: Option<String>,
    /// Final disposition
    pub status: CallStatus,
    /// When the connection was accepted
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// When the call ended
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    /// Accumulated summary text
    pub summary: String,
    /// Accumulated agent transcript
    pub transcript: String,
}

/// Fire-and-forget notifier for end-of-call reports.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    url: Option<Url>,
}

impl Notifier {
    /// Build a notifier for the configured collector endpoint. An
    /// unparseable URL disables delivery rather than failing startup.
    pub fn new(url: Option<String>) -> Self {
        let url = url.and_then(|raw| match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("invalid notification URL {raw:?}, reports disabled: {e}");
                None
            }
        });
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// A notifier that drops every report. Used when no collector is
    /// configured and in tests.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
        }
    }

    /// Whether reports will actually be delivered anywhere.
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Deliver one report. Never blocks the caller and never fails loudly:
    /// the POST runs on its own task and errors are logged only.
    pub fn deliver(&self, report: CallReport) {
        let Some(url) = self.url.clone() else {
            debug!(
                call_id = ?report.call_id,
                "no notification endpoint configured, dropping call report"
            );
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(url).json(&report).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        call_id = ?report.call_id,
                        status = %report.status,
                        "call report delivered"
                    );
                }
                Ok(response) => {
                    warn!(
                        call_id = ?report.call_id,
                        http_status = %response.status(),
                        "call report rejected by collector"
                    );
                }
                Err(e) => {
                    warn!(call_id = ?report.call_id, "call report delivery failed: {e}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_report(status: CallStatus) -> CallReport {
        let started = OffsetDateTime::now_utc();
        CallReport {
            lead_reference: "lead-1".to_string(),
            call_id: Some("CA123".to_string()),
            status,
            started_at: started,
            ended_at: Some(started),
            summary: "caller asked about pricing".to_string(),
            transcript: "hello there".to_string(),
        }
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = sample_report(CallStatus::Completed);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["call_id"], "CA123");
        assert_eq!(value["lead_reference"], "lead-1");
        // RFC 3339 timestamps
        assert!(value["started_at"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_delivery_posts_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/call-report"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(format!("{}/call-report", server.uri())));
        assert!(notifier.is_enabled());
        notifier.deliver(sample_report(CallStatus::Completed));

        // Delivery is spawned; give it a moment before the mock verifies on drop.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        let body: CallReport = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body.call_id.as_deref(), Some("CA123"));
        assert_eq!(body.status, CallStatus::Completed);
    }

    #[tokio::test]
    async fn test_disabled_notifier_drops_report() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        // Must not panic or block.
        notifier.deliver(sample_report(CallStatus::Failed));
    }

    #[tokio::test]
    async fn test_invalid_url_disables_delivery() {
        let notifier = Notifier::new(Some("not a url".to_string()));
        assert!(!notifier.is_enabled());
    }
}
