//! Voice call channel seam.
//!
//! The hosted voice agent is reached through a [`CallChannel`]. Implementations
//! push lifecycle and transcript events into an [`EventHub`]; a call session
//! subscribes once and owns the resulting [`EventStream`] for its lifetime.
//! Dropping the stream is the unsubscribe: the hub prunes closed senders on the
//! next emit, so no event is delivered to a session that has been discarded.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::transcript::Role;

/// Receiving half of a channel subscription.
pub type EventStream = mpsc::UnboundedReceiver<ChannelEvent>;

// ────────────────────────────────────────────────────────────────────────────
// Start parameters
// ────────────────────────────────────────────────────────────────────────────

/// What the channel dials: a workflow (question generation) or an assistant
/// (the interviewer itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Workflow(String),
    Assistant(String),
}

impl CallTarget {
    pub fn id(&self) -> &str {
        match self {
            CallTarget::Workflow(id) | CallTarget::Assistant(id) => id,
        }
    }
}

/// Template variables handed to the remote agent at call start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallVariables {
    pub username: String,
    pub userid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Events
// ────────────────────────────────────────────────────────────────────────────

/// Payload of a `message` event. Only `type == "transcript"` messages carry
/// dialogue; `transcriptType` distinguishes interim fragments from finals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transcript_type: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub transcript: Option<String>,
}

impl ChannelMessage {
    pub fn final_transcript(role: Role, text: impl Into<String>) -> Self {
        Self {
            kind: "transcript".to_string(),
            transcript_type: Some("final".to_string()),
            role: Some(role),
            transcript: Some(text.into()),
        }
    }

    pub fn partial_transcript(role: Role, text: impl Into<String>) -> Self {
        Self {
            kind: "transcript".to_string(),
            transcript_type: Some("partial".to_string()),
            role: Some(role),
            transcript: Some(text.into()),
        }
    }

    pub fn is_final_transcript(&self) -> bool {
        self.kind == "transcript" && self.transcript_type.as_deref() == Some("final")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    CallStart,
    CallEnd,
    Message(ChannelMessage),
    SpeechStart,
    SpeechEnd,
    Error(ChannelError),
}

impl ChannelEvent {
    /// Wire name of the event, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::CallStart => "call-start",
            ChannelEvent::CallEnd => "call-end",
            ChannelEvent::Message(_) => "message",
            ChannelEvent::SpeechStart => "speech-start",
            ChannelEvent::SpeechEnd => "speech-end",
            ChannelEvent::Error(_) => "error",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// A failure reported by the channel, either as the result of `start()` or as
/// an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Error, Deserialize)]
#[error("{kind}: {message}")]
pub struct ChannelError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

/// How the session reacts to a [`ChannelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The remote side refused the request (bad configuration). Never retried.
    Rejected,
    /// The remote room/meeting is gone. Never retried.
    SessionEnded,
    /// The real-time media transport failed. Never retried.
    Transport,
    /// Network-layer hiccup. Retried with backoff.
    Transient,
}

impl FailureClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureClass::Transient)
    }
}

const ENDED_MARKERS: &[&str] = &["meeting has ended", "meeting ended", "ejected"];
const TRANSPORT_MARKERS: &[&str] = &["transport", "webrtc", "ice connection", "ice failed"];
const TRANSIENT_MARKERS: &[&str] = &[
    "network",
    "failed to fetch",
    "fetch failed",
    "timed out",
    "timeout",
    "unreachable",
    "connection refused",
    "connection reset",
];

impl ChannelError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Classifies the error. Unknown errors are treated as rejections so that
    /// nothing is retried unless it is recognisably transient.
    pub fn classify(&self) -> FailureClass {
        let message = self.message.to_lowercase();
        let kind = self.kind.to_lowercase();

        if self.status == Some(400) || message.contains("bad request") {
            return FailureClass::Rejected;
        }
        if kind == "ejected" || ENDED_MARKERS.iter().any(|m| message.contains(m)) {
            return FailureClass::SessionEnded;
        }
        if kind.contains("daily")
            || kind.contains("transport")
            || TRANSPORT_MARKERS.iter().any(|m| message.contains(m))
        {
            return FailureClass::Transport;
        }
        if matches!(self.status, Some(s) if s >= 500)
            || TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
        {
            return FailureClass::Transient;
        }
        FailureClass::Rejected
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Channel trait + event fan-out
// ────────────────────────────────────────────────────────────────────────────

/// A bidirectional real-time connection to the hosted voice agent.
///
/// Injected into the call session as `Arc<dyn CallChannel>`, so tests can
/// substitute a scripted channel.
#[async_trait]
pub trait CallChannel: Send + Sync {
    /// Registers a new subscriber. Events emitted after this call are
    /// delivered in emission order until the stream is dropped.
    fn subscribe(&self) -> EventStream;

    async fn start(
        &self,
        target: &CallTarget,
        variables: &CallVariables,
    ) -> Result<(), ChannelError>;

    async fn stop(&self) -> Result<(), ChannelError>;
}

/// Subscriber registry for channel implementations.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChannelEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Delivers `event` to every live subscriber, dropping the ones whose
    /// stream has been released.
    pub fn emit(&self, event: ChannelEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<ChannelEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
