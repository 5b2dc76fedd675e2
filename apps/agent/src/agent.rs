//! Call session driver.
//!
//! `InterviewAgent` owns a [`CallSession`] and runs it as a single task: a
//! `select!` loop over user commands, channel events and the retry deadline.
//! Each step runs to completion before the next is taken, so the session is
//! never touched concurrently. A snapshot is published over a `watch` channel
//! after every step for the UI to render.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::channel::{
    CallChannel, CallTarget, CallVariables, ChannelError, ChannelEvent, EventStream,
};
use crate::config::AgentConfig;
use crate::feedback::FeedbackService;
use crate::probe::ReachabilityProbe;
use crate::session::{
    CallSession, CallStatus, FailureOutcome, Notice, NoticeKind, RetryPolicy, RetryTicket,
    SessionMode,
};
use crate::transcript::{Transcript, TranscriptEntry};
use crate::trigger::{FeedbackTrigger, Navigator, Route};

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Disconnect,
}

/// The person on the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerProfile {
    pub user_name: String,
    pub user_id: String,
}

/// External collaborators, injected so tests can substitute fakes.
pub struct AgentDeps {
    pub channel: Arc<dyn CallChannel>,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub feedback: Arc<dyn FeedbackService>,
    pub navigator: Arc<dyn Navigator>,
}

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: CallStatus,
    pub is_speaking: bool,
    pub retry_count: u32,
    pub last_message: Option<TranscriptEntry>,
    pub transcript_len: usize,
    pub notice: Option<Notice>,
}

impl SessionSnapshot {
    fn of(session: &CallSession) -> Self {
        Self {
            status: session.status(),
            is_speaking: session.is_speaking(),
            retry_count: session.retry_count(),
            last_message: session.transcript().last().cloned(),
            transcript_len: session.transcript().len(),
            notice: session.notice().cloned(),
        }
    }
}

/// Returned when the driver stops.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub status: CallStatus,
    pub transcript: Transcript,
    pub route: Option<Route>,
    pub notice: Option<Notice>,
}

/// UI-side handle to a running agent.
#[derive(Debug)]
pub struct AgentHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl AgentHandle {
    /// Returns false if the agent has already stopped.
    pub fn start(&self) -> bool {
        self.commands.send(Command::Start).is_ok()
    }

    pub fn disconnect(&self) -> bool {
        self.commands.send(Command::Disconnect).is_ok()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Waits until a published snapshot satisfies `predicate`. Returns `None`
    /// if the agent stops first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        self.snapshots
            .wait_for(predicate)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Driver
// ────────────────────────────────────────────────────────────────────────────

enum ConnectError {
    Unreachable(String),
    Channel(ChannelError),
}

pub struct InterviewAgent {
    session: CallSession,
    caller: CallerProfile,
    config: AgentConfig,
    channel: Arc<dyn CallChannel>,
    probe: Arc<dyn ReachabilityProbe>,
    events: EventStream,
    events_open: bool,
    trigger: FeedbackTrigger,
    retry_at: Option<(Instant, RetryTicket)>,
    route: Option<Route>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl InterviewAgent {
    /// Builds the agent and subscribes to the channel. The subscription lives
    /// exactly as long as the agent.
    pub fn new(
        mode: SessionMode,
        caller: CallerProfile,
        config: AgentConfig,
        policy: RetryPolicy,
        deps: AgentDeps,
    ) -> Self {
        let session = CallSession::new(mode, policy);
        let (snapshots, _) = watch::channel(SessionSnapshot::of(&session));
        let trigger = FeedbackTrigger::new(deps.feedback, deps.navigator, caller.user_id.clone());
        Self {
            session,
            events: deps.channel.subscribe(),
            events_open: true,
            channel: deps.channel,
            probe: deps.probe,
            caller,
            config,
            trigger,
            retry_at: None,
            route: None,
            snapshots,
        }
    }

    /// Spawns the driver on the current runtime.
    pub fn spawn(self) -> (AgentHandle, JoinHandle<SessionReport>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let handle = AgentHandle {
            commands: commands_tx,
            snapshots: self.snapshots.subscribe(),
        };
        (handle, tokio::spawn(self.run(commands_rx)))
    }

    /// Runs until the session finishes (and the post-call routing is done), or
    /// until every command sender is dropped while no call is live.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) -> SessionReport {
        info!(mode = self.session.mode().label(), "call session ready");

        loop {
            if self.session.status() == CallStatus::Finished {
                self.route = self
                    .trigger
                    .on_finished(self.session.mode(), self.session.transcript().entries())
                    .await;
                break;
            }

            let retry_at = self.retry_at;
            let retry_timer = async move {
                match retry_at {
                    Some((deadline, _)) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Start) => self.start_call(&mut commands).await,
                    Some(Command::Disconnect) => self.disconnect().await,
                    None if self.session.status().is_live() => {
                        debug!("all handles dropped during a live call; hanging up");
                        self.disconnect().await;
                    }
                    None => break,
                },
                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!("voice channel closed its event stream");
                        self.events_open = false;
                    }
                },
                _ = retry_timer => self.fire_retry(&mut commands).await,
            }

            self.publish();
        }

        self.publish();
        info!(status = ?self.session.status(), turns = self.session.transcript().len(), "call session closed");
        SessionReport {
            status: self.session.status(),
            transcript: self.session.transcript().clone(),
            route: self.route.take(),
            notice: self.session.notice().cloned(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(SessionSnapshot::of(&self.session));
    }

    async fn start_call(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) {
        if let Err(e) = self.session.begin_start() {
            warn!(error = %e, "start ignored");
            return;
        }
        self.publish();

        if let Some(target) = self.resolve_target() {
            self.attempt_connect(target, true, commands).await;
        }
    }

    async fn fire_retry(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) {
        let Some((_, ticket)) = self.retry_at.take() else {
            return;
        };
        if !self.session.take_due_retry(ticket) {
            return;
        }
        info!(attempt = ticket.attempt, "retrying voice channel start");

        if let Some(target) = self.resolve_target() {
            self.attempt_connect(target, false, commands).await;
        }
    }

    fn resolve_target(&mut self) -> Option<CallTarget> {
        match self.config.target_for(self.session.mode()) {
            Ok(target) => Some(target),
            Err(e) => {
                error!(error = %e, "voice channel is not configured");
                self.session
                    .settle(Notice::new(NoticeKind::Configuration, e.to_string()));
                None
            }
        }
    }

    /// One start attempt. Commands keep being served while it is in flight: a
    /// disconnect drops the attempt and finishes the session.
    async fn attempt_connect(
        &mut self,
        target: CallTarget,
        probe_first: bool,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) {
        let variables = self.call_variables();
        let policy = *self.session.policy();

        let outcome = {
            let attempt = connect(
                self.channel.as_ref(),
                self.probe.as_ref(),
                &mut self.events,
                &target,
                &variables,
                policy,
                probe_first,
            );
            tokio::pin!(attempt);

            loop {
                tokio::select! {
                    biased;
                    command = commands.recv() => match command {
                        Some(Command::Start) => debug!("start ignored while connecting"),
                        Some(Command::Disconnect) | None => break None,
                    },
                    result = &mut attempt => break Some(result),
                }
            }
        };

        match outcome {
            None => {
                info!("start attempt cancelled by disconnect");
                self.disconnect().await;
            }
            Some(Ok(())) => {
                info!(target = target.id(), "voice channel accepted start; awaiting call-start");
            }
            Some(Err(ConnectError::Unreachable(reason))) => {
                self.session.settle(Notice::new(
                    NoticeKind::Unreachable,
                    format!(
                        "Cannot reach the voice service ({reason}). Check your internet connection and try again."
                    ),
                ));
            }
            Some(Err(ConnectError::Channel(e))) => self.on_failure(e),
        }
    }

    fn call_variables(&self) -> CallVariables {
        let questions = match self.session.mode() {
            SessionMode::Interview(context) => Some(format_questions(&context.questions)),
            SessionMode::Generate => None,
        };
        CallVariables {
            username: self.caller.user_name.clone(),
            userid: self.caller.user_id.clone(),
            questions,
        }
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        debug!(event = event.name(), status = ?self.session.status(), "channel event");
        match event {
            ChannelEvent::CallStart => {
                self.session.on_call_start();
            }
            ChannelEvent::CallEnd => {
                self.session.on_call_end();
            }
            ChannelEvent::SpeechStart => self.session.set_speaking(true),
            ChannelEvent::SpeechEnd => self.session.set_speaking(false),
            ChannelEvent::Message(message) => {
                self.session.record_message(&message);
            }
            ChannelEvent::Error(e) => self.on_failure(e),
        }
    }

    fn on_failure(&mut self, e: ChannelError) {
        match self.session.fail(&e) {
            FailureOutcome::Retry(ticket) => {
                info!(
                    attempt = ticket.attempt,
                    delay_ms = ticket.delay.as_millis() as u64,
                    error = %e,
                    "scheduling voice channel retry"
                );
                self.retry_at = Some((Instant::now() + ticket.delay, ticket));
            }
            FailureOutcome::Settled => error!(error = %e, "voice call failed"),
            FailureOutcome::Ignored => debug!(error = %e, "voice channel error ignored"),
        }
    }

    /// Sends `stop` to the channel, then finishes the session locally.
    async fn disconnect(&mut self) {
        if !self.session.status().is_live() {
            debug!(status = ?self.session.status(), "nothing to disconnect");
            return;
        }
        if let Err(e) = self.channel.stop().await {
            warn!(error = %e, "voice channel stop failed");
        }
        self.session.disconnect();
        self.retry_at = None;
    }
}

/// Probe (optional), release any previous connection, then start.
async fn connect(
    channel: &dyn CallChannel,
    probe: &dyn ReachabilityProbe,
    events: &mut EventStream,
    target: &CallTarget,
    variables: &CallVariables,
    policy: RetryPolicy,
    probe_first: bool,
) -> Result<(), ConnectError> {
    if probe_first {
        match tokio::time::timeout(policy.probe_timeout, probe.check()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ConnectError::Unreachable(e.to_string())),
            Err(_) => {
                return Err(ConnectError::Unreachable(format!(
                    "no response within {}s",
                    policy.probe_timeout.as_secs()
                )))
            }
        }
    }

    if let Err(e) = channel.stop().await {
        debug!(error = %e, "stopping previous connection failed");
    }
    tokio::time::sleep(policy.cooldown).await;

    // Anything still queued belongs to the connection that was just released.
    while let Ok(event) = events.try_recv() {
        debug!(event = event.name(), "dropping event from previous connection");
    }

    channel
        .start(target, variables)
        .await
        .map_err(ConnectError::Channel)
}

/// Renders the question list the interviewer assistant reads from.
fn format_questions(questions: &[String]) -> String {
    questions
        .iter()
        .map(|q| format!("- {q}"))
        .collect::<Vec<_>>()
        .join("\n")
}
