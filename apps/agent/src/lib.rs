//! Client-side lifecycle of a mock-interview voice call.
//!
//! An [`InterviewAgent`] drives one [`CallSession`] against an injected
//! [`CallChannel`]: it starts the call, accumulates the finalized transcript,
//! applies the retry policy on failures, and when the call finishes hands off
//! to the [`FeedbackTrigger`], which requests feedback (interview mode) and
//! routes the user.

pub mod agent;
pub mod channel;
pub mod config;
pub mod feedback;
pub mod probe;
pub mod session;
pub mod transcript;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use agent::{AgentDeps, AgentHandle, CallerProfile, InterviewAgent, SessionReport, SessionSnapshot};
pub use channel::{CallChannel, CallTarget, CallVariables, ChannelError, ChannelEvent, EventHub};
pub use config::AgentConfig;
pub use feedback::{FeedbackService, HttpFeedbackClient};
pub use probe::{HttpProbe, ReachabilityProbe};
pub use session::{CallSession, CallStatus, InterviewContext, RetryPolicy, SessionMode};
pub use transcript::{Role, Transcript, TranscriptEntry};
pub use trigger::{FeedbackTrigger, Navigator, Route};
