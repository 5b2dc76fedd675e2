//! Call session state machine.
//!
//! `Inactive → Connecting → Active → Finished`, with failures settling back to
//! `Inactive` or re-entering `Connecting` under the retry policy. `Finished` is
//! terminal: a new call needs a new session.
//!
//! This type holds state only and performs no I/O; the agent driver feeds it
//! channel events and user commands and carries out the side effects.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::{ChannelError, ChannelMessage, FailureClass};
use crate::transcript::Transcript;

/// Maximum number of automatic retries per call attempt.
pub const RETRY_CEILING: u32 = 2;
/// Retry `n` waits `n × RETRY_BASE_DELAY`.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
/// Pause between stopping a previous connection and starting a new one.
pub const RECONNECT_COOLDOWN: Duration = Duration::from_millis(500);
/// Hard limit for the reachability probe. A probe that times out is not retried.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub ceiling: u32,
    pub base_delay: Duration,
    pub cooldown: Duration,
    pub probe_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            ceiling: RETRY_CEILING,
            base_delay: RETRY_BASE_DELAY,
            cooldown: RECONNECT_COOLDOWN,
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Linear backoff.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Inactive,
    Connecting,
    Active,
    Finished,
}

impl CallStatus {
    /// A call attempt is in progress.
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::Connecting | CallStatus::Active)
    }
}

/// The interview a session is conducting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewContext {
    pub interview_id: Uuid,
    pub questions: Vec<String>,
    /// Existing feedback to overwrite when the call ends.
    pub feedback_id: Option<Uuid>,
}

impl InterviewContext {
    /// Builds a context from route parameters. Ids that the feedback endpoint
    /// would refuse are rejected here, before any call is placed.
    pub fn parse(
        interview_id: &str,
        questions: Vec<String>,
        feedback_id: Option<&str>,
    ) -> Result<Self, SessionError> {
        let parse_id = |field: &str, value: &str| {
            Uuid::try_parse(value.trim()).map_err(|_| {
                SessionError::Configuration(format!("{field} '{value}' is not a valid id"))
            })
        };
        Ok(Self {
            interview_id: parse_id("interview id", interview_id)?,
            questions,
            feedback_id: feedback_id
                .filter(|id| !id.trim().is_empty())
                .map(|id| parse_id("feedback id", id))
                .transpose()?,
        })
    }
}

/// Fixed at session creation; decides the call target, the call variables and
/// what happens after the call ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Talk to the generation workflow, which creates interviews server-side.
    Generate,
    /// Run an interview and request feedback on the transcript afterwards.
    Interview(InterviewContext),
}

impl SessionMode {
    pub fn label(&self) -> &'static str {
        match self {
            SessionMode::Generate => "generate",
            SessionMode::Interview(_) => "interview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Configuration,
    Unreachable,
    Rejected,
    Connectivity,
    RetriesExhausted,
}

/// User-visible explanation of why a call attempt stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("A call is already in progress ({0:?})")]
    Busy(CallStatus),

    #[error("This session has finished; start a new session to call again")]
    Finished,
}

/// A scheduled retry. Only the ticket the session currently holds may run;
/// any other ticket is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTicket {
    pub attempt: u32,
    pub delay: Duration,
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Retry(RetryTicket),
    Settled,
    Ignored,
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CallSession {
    mode: SessionMode,
    policy: RetryPolicy,
    status: CallStatus,
    is_speaking: bool,
    retry_count: u32,
    transcript: Transcript,
    notice: Option<Notice>,
    /// Bumped on every status change; tickets from an older epoch are stale.
    epoch: u64,
    pending_retry: Option<RetryTicket>,
}

impl CallSession {
    pub fn new(mode: SessionMode, policy: RetryPolicy) -> Self {
        Self {
            mode,
            policy,
            status: CallStatus::Inactive,
            is_speaking: false,
            retry_count: 0,
            transcript: Transcript::new(),
            notice: None,
            epoch: 0,
            pending_retry: None,
        }
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.pending_retry.is_some()
    }

    /// User pressed "start". Only valid from `Inactive`.
    pub fn begin_start(&mut self) -> Result<(), SessionError> {
        match self.status {
            CallStatus::Inactive => {}
            CallStatus::Finished => return Err(SessionError::Finished),
            other => return Err(SessionError::Busy(other)),
        }
        self.retry_count = 0;
        self.notice = None;
        self.pending_retry = None;
        self.transition(CallStatus::Connecting);
        Ok(())
    }

    /// Channel reported `call-start`.
    pub fn on_call_start(&mut self) -> bool {
        if self.status != CallStatus::Connecting {
            debug!(status = ?self.status, "ignoring call-start outside Connecting");
            return false;
        }
        self.retry_count = 0;
        self.pending_retry = None;
        self.transition(CallStatus::Active);
        true
    }

    /// Channel reported `call-end`.
    pub fn on_call_end(&mut self) -> bool {
        if !self.status.is_live() {
            debug!(status = ?self.status, "ignoring call-end with no live call");
            return false;
        }
        self.finish();
        true
    }

    pub fn set_speaking(&mut self, speaking: bool) {
        if self.status == CallStatus::Finished {
            return;
        }
        self.is_speaking = speaking;
    }

    /// Feeds a `message` event to the transcript. Returns true if an entry was
    /// appended.
    pub fn record_message(&mut self, message: &ChannelMessage) -> bool {
        if !self.status.is_live() {
            return false;
        }
        match self.transcript.record(message) {
            Some(entry) => {
                debug!(role = ?entry.role, "transcript entry appended");
                true
            }
            None => false,
        }
    }

    /// Applies the retry policy to a channel failure.
    pub fn fail(&mut self, error: &ChannelError) -> FailureOutcome {
        if !self.status.is_live() {
            debug!(status = ?self.status, error = %error, "ignoring error with no live call");
            return FailureOutcome::Ignored;
        }
        if self.pending_retry.is_some() {
            debug!(error = %error, "ignoring error while a retry is already scheduled");
            return FailureOutcome::Ignored;
        }

        match error.classify() {
            FailureClass::Rejected => {
                self.settle(Notice::new(
                    NoticeKind::Rejected,
                    format!(
                        "The voice service rejected the call: {}. Check the assistant and workflow configuration.",
                        error.message
                    ),
                ));
                FailureOutcome::Settled
            }
            FailureClass::SessionEnded | FailureClass::Transport => {
                self.settle(Notice::new(
                    NoticeKind::Connectivity,
                    "The call connection was lost. Check your network connection, microphone \
                     permissions and any firewall or VPN blocking real-time audio, then start a new call.",
                ));
                FailureOutcome::Settled
            }
            FailureClass::Transient if self.retry_count < self.policy.ceiling => {
                self.retry_count += 1;
                self.is_speaking = false;
                self.transition(CallStatus::Connecting);
                let ticket = RetryTicket {
                    attempt: self.retry_count,
                    delay: self.policy.delay_for(self.retry_count),
                    epoch: self.epoch,
                };
                self.pending_retry = Some(ticket);
                FailureOutcome::Retry(ticket)
            }
            FailureClass::Transient => {
                self.settle(Notice::new(
                    NoticeKind::RetriesExhausted,
                    format!(
                        "Could not connect to the voice service after {} retries: {}",
                        self.policy.ceiling, error.message
                    ),
                ));
                FailureOutcome::Settled
            }
        }
    }

    /// Ends the attempt in `Inactive` with a notice for the user.
    pub fn settle(&mut self, notice: Notice) {
        warn!(kind = ?notice.kind, message = %notice.message, "call attempt failed");
        self.pending_retry = None;
        self.is_speaking = false;
        self.notice = Some(notice);
        self.transition(CallStatus::Inactive);
    }

    /// Consumes `ticket` if it is still the session's pending retry.
    pub fn take_due_retry(&mut self, ticket: RetryTicket) -> bool {
        if self.status == CallStatus::Connecting
            && self.epoch == ticket.epoch
            && self.pending_retry == Some(ticket)
        {
            self.pending_retry = None;
            return true;
        }
        debug!(attempt = ticket.attempt, "discarding stale retry");
        false
    }

    /// User hung up. The caller must already have sent `stop` to the channel.
    pub fn disconnect(&mut self) -> bool {
        if !self.status.is_live() {
            return false;
        }
        self.finish();
        true
    }

    fn finish(&mut self) {
        self.pending_retry = None;
        self.is_speaking = false;
        self.transition(CallStatus::Finished);
    }

    fn transition(&mut self, next: CallStatus) {
        if self.status == next {
            return;
        }
        info!(from = ?self.status, to = ?next, mode = self.mode.label(), "call status changed");
        self.status = next;
        self.epoch += 1;
    }
}
