//! Relay orchestrator.
//!
//! One `CallRelay` exists per accepted telephony connection. It owns the
//! per-call state and the command channels to both connections, and it is
//! driven from a single `select!` loop, so handling of one inbound event
//! (including every state mutation and any outbound send it triggers) always
//! completes before the next event for the same call is processed. Sends are
//! channel pushes into per-connection pump tasks and never wait on a round
//! trip to the other side.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::session::{CallSession, RelayPhase};
use super::CommitPolicy;
use crate::core::downstream::events::{DownstreamCommand, OutboundStreamEvent, StreamEvent};
use crate::core::upstream::client::{UpstreamCommand, UpstreamEvent};
use crate::core::upstream::config::{TELEPHONY_AUDIO_FORMAT, UpstreamConfig};
use crate::core::upstream::messages::{ClientEvent, SessionConfig, TurnDetection};
use crate::notify::{CallReport, CallStatus, Notifier};

/// One-off instructions for the final summary turn requested on stop.
const SUMMARY_INSTRUCTIONS: &str = "The call has ended. Summarize the conversation in two or \
     three sentences: who called, what they wanted, and any follow-up that was agreed.";

/// Coordinates one call's two streaming connections.
pub struct CallRelay {
    session: CallSession,
    phase: RelayPhase,
    policy: CommitPolicy,
    upstream_tx: mpsc::Sender<UpstreamCommand>,
    downstream_tx: mpsc::Sender<DownstreamCommand>,
    notifier: Notifier,
    report_sent: bool,
}

impl CallRelay {
    /// Wire a relay for a freshly accepted connection. The upstream
    /// connection must already be open; `configure` completes the handshake.
    pub fn new(
        lead_reference: String,
        policy: CommitPolicy,
        upstream_tx: mpsc::Sender<UpstreamCommand>,
        downstream_tx: mpsc::Sender<DownstreamCommand>,
        notifier: Notifier,
    ) -> Self {
        Self {
            session: CallSession::new(lead_reference),
            phase: RelayPhase::Connecting,
            policy,
            upstream_tx,
            downstream_tx,
            notifier,
            report_sent: false,
        }
    }

    /// Current per-call state, read-only.
    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RelayPhase {
        self.phase
    }

    /// Send the session-configuration message and the initial greeting
    /// request, then open the audio gate.
    ///
    /// This step is fire-and-forget: readiness is declared once the sends are
    /// queued, without waiting for a configuration acknowledgment. Caller
    /// audio arriving in the (short) window before the model applies the
    /// configuration is dropped by the model, not by us.
    pub async fn configure(&mut self, config: &UpstreamConfig) {
        self.phase = RelayPhase::Configuring;

        let session = SessionConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: Some(config.instructions.clone()),
            voice: Some(config.voice.as_str().to_string()),
            input_audio_format: Some(TELEPHONY_AUDIO_FORMAT.to_string()),
            output_audio_format: Some(TELEPHONY_AUDIO_FORMAT.to_string()),
            turn_detection: Some(TurnDetection::ServerVad {
                threshold: None,
                prefix_padding_ms: None,
                silence_duration_ms: None,
            }),
        };
        self.send_upstream(ClientEvent::SessionUpdate { session }).await;
        self.send_upstream(ClientEvent::response_with_instructions(
            config.greeting.clone(),
            None,
        ))
        .await;

        self.session.upstream_ready = true;
        self.phase = RelayPhase::Active;
        debug!(lead = %self.session.lead_reference, "upstream session configured");
    }

    /// Handle one inbound telephony event. Returns `false` once the loop
    /// should stop.
    pub async fn handle_stream_event(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Connected => {
                debug!("telephony stream connected");
                true
            }

            StreamEvent::Start { start } => {
                if !start.media_format.is_telephony_encoding() {
                    // No transcoding exists, so a format mismatch can never work.
                    error!(
                        call_sid = %start.call_sid,
                        encoding = %start.media_format.encoding,
                        sample_rate = start.media_format.sample_rate,
                        "stream format does not match the fixed telephony encoding"
                    );
                    self.teardown(CallStatus::Failed).await;
                    return false;
                }
                info!(
                    call_sid = %start.call_sid,
                    stream_sid = %start.stream_sid,
                    lead = %self.session.lead_reference,
                    "call started"
                );
                self.session.call_id = Some(start.call_sid);
                self.session.stream_sid = Some(start.stream_sid);
                true
            }

            StreamEvent::Media { media } => {
                if self.session.upstream_ready {
                    self.send_upstream(ClientEvent::audio_append(media.payload)).await;
                    self.session.pending_input_frames += 1;
                    if self.policy.threshold_crossed(self.session.pending_input_frames) {
                        self.commit_pending().await;
                    }
                } else {
                    // Dropped, not queued: stale audio is worse than lost audio.
                    debug!("upstream not ready, dropping caller frame");
                }

                if self.session.agent_speaking {
                    // Barge-in: the caller spoke over the agent. Cancel the
                    // in-flight turn once; cancellation is best-effort and
                    // idempotent upstream.
                    debug!("barge-in detected, cancelling agent response");
                    self.send_upstream(ClientEvent::ResponseCancel).await;
                    self.session.agent_speaking = false;
                }
                true
            }

            StreamEvent::Stop => {
                info!(call_id = ?self.session.call_id, "call stopped by telephony side");
                self.session.call_ended_at = Some(time::OffsetDateTime::now_utc());
                self.phase = RelayPhase::WrappingUp;
                // Best-effort summary turn; not awaited to completion. Text
                // deltas that arrive before teardown still land in the
                // accumulator, but the report goes out with whatever exists now.
                self.send_upstream(ClientEvent::response_with_instructions(
                    SUMMARY_INSTRUCTIONS.to_string(),
                    Some(vec!["text".to_string()]),
                ))
                .await;
                self.teardown(CallStatus::Completed).await;
                false
            }

            StreamEvent::Mark | StreamEvent::Unknown => true,
        }
    }

    /// Handle one decoded upstream event. Returns `false` once the loop
    /// should stop.
    pub async fn handle_upstream_event(&mut self, event: UpstreamEvent) -> bool {
        match event {
            UpstreamEvent::AudioDelta(payload) => {
                self.session.agent_speaking = true;
                if self.session.downstream_closed {
                    return true;
                }
                match &self.session.stream_sid {
                    Some(stream_sid) => {
                        let frame = OutboundStreamEvent::media(stream_sid.clone(), payload);
                        if let Err(e) = self.downstream_tx.send(DownstreamCommand::Event(frame)).await
                        {
                            // One lost frame is an audio glitch, not a dead call.
                            warn!("failed to queue agent audio frame: {e}");
                        }
                    }
                    None => debug!("agent audio before stream start, dropping frame"),
                }
                true
            }

            UpstreamEvent::OutputComplete => {
                self.session.agent_speaking = false;
                true
            }

            UpstreamEvent::TranscriptDelta(delta) => {
                self.session.accumulated_transcript.push_str(&delta);
                true
            }

            UpstreamEvent::TextDelta(delta) => {
                self.session.accumulated_summary.push_str(&delta);
                true
            }

            UpstreamEvent::ServerError(message) => {
                // Non-fatal unless the transport also closes, which arrives
                // separately as Closed.
                warn!(call_id = ?self.session.call_id, "upstream error event: {message}");
                true
            }

            UpstreamEvent::Closed => {
                warn!(call_id = ?self.session.call_id, "upstream connection closed");
                self.teardown(CallStatus::Failed).await;
                false
            }
        }
    }

    /// Timer-driven commit safety net: flush whatever input is pending.
    pub async fn handle_commit_tick(&mut self) {
        if self.session.upstream_ready && self.session.pending_input_frames > 0 {
            self.commit_pending().await;
        }
    }

    /// The telephony socket closed or errored without a stop event.
    pub async fn handle_downstream_closed(&mut self) {
        self.session.downstream_closed = true;
        self.teardown(CallStatus::Failed).await;
    }

    /// Release both connections and emit the end-of-call report.
    ///
    /// Idempotent and safe to invoke from any event arm: the first call wins,
    /// later calls return immediately. Each release step is fault-isolated; a
    /// failure closing one side never prevents closing the other, and nothing
    /// here panics past this boundary.
    pub async fn teardown(&mut self, status: CallStatus) {
        if self.phase == RelayPhase::Closed {
            return;
        }
        self.phase = RelayPhase::Closed;
        self.session.upstream_ready = false;
        self.session.downstream_closed = true;
        if self.session.call_ended_at.is_none() {
            self.session.call_ended_at = Some(time::OffsetDateTime::now_utc());
        }

        self.emit_report(status);

        if self.downstream_tx.send(DownstreamCommand::Close).await.is_err() {
            debug!("downstream sender already gone");
        }
        if self.upstream_tx.send(UpstreamCommand::Close).await.is_err() {
            debug!("upstream sender already gone");
        }
        info!(call_id = ?self.session.call_id, status = %status, "call session torn down");
    }

    /// Emit the end-of-call report at most once per session.
    fn emit_report(&mut self, status: CallStatus) {
        if self.report_sent {
            return;
        }
        self.report_sent = true;
        self.notifier.deliver(CallReport {
            lead_reference: self.session.lead_reference.clone(),
            call_id: self.session.call_id.clone(),
            status,
            started_at: self.session.call_started_at,
            ended_at: self.session.call_ended_at,
            summary: self.session.accumulated_summary.clone(),
            transcript: self.session.accumulated_transcript.clone(),
        });
    }

    async fn commit_pending(&mut self) {
        self.send_upstream(ClientEvent::InputAudioBufferCommit).await;
        self.session.pending_input_frames = 0;
    }

    async fn send_upstream(&self, event: ClientEvent) {
        if let Err(e) = self.upstream_tx.send(UpstreamCommand::Send(event)).await {
            // The pump task is gone; its Closed event will tear the call down.
            warn!("failed to queue upstream message: {e}");
        }
    }
}
