//! Scripted collaborators for agent tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent::AgentDeps;
use crate::channel::{
    CallChannel, CallTarget, CallVariables, ChannelError, ChannelEvent, EventHub, EventStream,
};
use crate::config::AgentConfig;
use crate::feedback::{FeedbackError, FeedbackRequest, FeedbackResponse, FeedbackService};
use crate::probe::{ProbeError, ReachabilityProbe};
use crate::trigger::{Navigator, Route};

pub const WORKFLOW_ID: &str = "0b6f2d3e-9a1c-4f5e-8d7b-2c3a4b5c6d7e";
pub const ASSISTANT_ID: &str = "7e6d5c4b-3a2c-4b7d-8e5f-4c1a9e3d2f6b";
pub const INTERVIEW_ID: &str = "5a1e9c2d-7b3f-4d6a-9e8c-0f1b2a3c4d5e";

pub fn interview_id() -> uuid::Uuid {
    uuid::Uuid::parse_str(INTERVIEW_ID).unwrap()
}

pub fn valid_config() -> AgentConfig {
    AgentConfig {
        web_token: Some("pk_test".to_string()),
        workflow_id: Some(WORKFLOW_ID.to_string()),
        assistant_id: Some(ASSISTANT_ID.to_string()),
        ..AgentConfig::default()
    }
}

pub fn network_error() -> ChannelError {
    ChannelError::new("start-method-error", "network error: failed to fetch")
}

// ────────────────────────────────────────────────────────────────────────────
// Channel
// ────────────────────────────────────────────────────────────────────────────

/// What the scripted channel does on the next `start()`.
pub enum StartScript {
    /// Accept and emit `call-start`.
    Connect,
    /// Accept without emitting anything.
    Accept,
    /// Return the error from `start()`.
    Fail(ChannelError),
    /// Accept, then emit the error as an event.
    FailEvent(ChannelError),
    /// Never resolve.
    Hang,
}

#[derive(Default)]
pub struct ScriptedChannel {
    hub: EventHub,
    script: Mutex<VecDeque<StartScript>>,
    starts: Mutex<Vec<(CallTarget, CallVariables)>>,
    stops: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new(script: Vec<StartScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn emit(&self, event: ChannelEvent) {
        self.hub.emit(event);
    }

    pub fn starts(&self) -> Vec<(CallTarget, CallVariables)> {
        self.starts.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

#[async_trait]
impl CallChannel for ScriptedChannel {
    fn subscribe(&self) -> EventStream {
        self.hub.subscribe()
    }

    async fn start(
        &self,
        target: &CallTarget,
        variables: &CallVariables,
    ) -> Result<(), ChannelError> {
        self.starts
            .lock()
            .unwrap()
            .push((target.clone(), variables.clone()));
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StartScript::Accept);

        match step {
            StartScript::Connect => {
                self.hub.emit(ChannelEvent::CallStart);
                Ok(())
            }
            StartScript::Accept => Ok(()),
            StartScript::Fail(err) => Err(err),
            StartScript::FailEvent(err) => {
                self.hub.emit(ChannelEvent::Error(err));
                Ok(())
            }
            StartScript::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Probe
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub enum FakeProbe {
    Reachable,
    Unreachable,
    Hang,
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn check(&self) -> Result<(), ProbeError> {
        match self {
            FakeProbe::Reachable => Ok(()),
            FakeProbe::Unreachable => Err(ProbeError("dns lookup failed".to_string())),
            FakeProbe::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Feedback + navigation
// ────────────────────────────────────────────────────────────────────────────

enum FeedbackOutcome {
    Success(String),
    NoId,
    Fail,
}

pub struct RecordingFeedback {
    outcome: FeedbackOutcome,
    calls: Mutex<Vec<FeedbackRequest>>,
}

impl RecordingFeedback {
    fn with(outcome: FeedbackOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(feedback_id: &str) -> Self {
        Self::with(FeedbackOutcome::Success(feedback_id.to_string()))
    }

    pub fn failing() -> Self {
        Self::with(FeedbackOutcome::Fail)
    }

    pub fn without_id() -> Self {
        Self::with(FeedbackOutcome::NoId)
    }

    pub fn calls(&self) -> Vec<FeedbackRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackService for RecordingFeedback {
    async fn create_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, FeedbackError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.outcome {
            FeedbackOutcome::Success(id) => Ok(FeedbackResponse {
                success: true,
                feedback_id: Some(id.clone()),
                error: None,
            }),
            FeedbackOutcome::NoId => Ok(FeedbackResponse {
                success: true,
                feedback_id: None,
                error: None,
            }),
            FeedbackOutcome::Fail => Err(FeedbackError::Api {
                status: 500,
                message: "model unavailable".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        self.routes.lock().unwrap().push(route.clone());
    }
}

/// Bundle of fakes with handles kept for assertions.
pub struct Harness {
    pub channel: Arc<ScriptedChannel>,
    pub feedback: Arc<RecordingFeedback>,
    pub navigator: Arc<RecordingNavigator>,
    pub probe: FakeProbe,
}

impl Harness {
    pub fn new(script: Vec<StartScript>) -> Self {
        Self {
            channel: Arc::new(ScriptedChannel::new(script)),
            feedback: Arc::new(RecordingFeedback::succeeding("fb-1")),
            navigator: Arc::new(RecordingNavigator::default()),
            probe: FakeProbe::Reachable,
        }
    }

    pub fn with_feedback(mut self, feedback: RecordingFeedback) -> Self {
        self.feedback = Arc::new(feedback);
        self
    }

    pub fn with_probe(mut self, probe: FakeProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn deps(&self) -> AgentDeps {
        AgentDeps {
            channel: self.channel.clone(),
            probe: Arc::new(self.probe),
            feedback: self.feedback.clone(),
            navigator: self.navigator.clone(),
        }
    }
}
