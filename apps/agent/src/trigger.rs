//! Post-call routing and feedback request.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::feedback::{FeedbackRequest, FeedbackResponse, FeedbackService};
use crate::session::{InterviewContext, SessionMode};
use crate::transcript::TranscriptEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Landing view.
    Home,
    /// Feedback detail view.
    Feedback {
        interview_id: String,
        feedback_id: String,
    },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Feedback {
                interview_id,
                feedback_id,
            } => format!("/interview/{interview_id}/feedback/{feedback_id}"),
        }
    }
}

/// Moves the user to another view. Implemented by the UI shell.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}

/// Runs once, on the session's single transition into `Finished`.
pub struct FeedbackTrigger {
    service: Arc<dyn FeedbackService>,
    navigator: Arc<dyn Navigator>,
    user_id: String,
    fired: bool,
}

impl FeedbackTrigger {
    pub fn new(
        service: Arc<dyn FeedbackService>,
        navigator: Arc<dyn Navigator>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            service,
            navigator,
            user_id: user_id.into(),
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Routes the user after the call. Interview sessions request feedback
    /// first; generate sessions go straight home. Returns `None` if the trigger
    /// already fired.
    pub async fn on_finished(
        &mut self,
        mode: &SessionMode,
        transcript: &[TranscriptEntry],
    ) -> Option<Route> {
        if self.fired {
            debug!("feedback trigger already fired");
            return None;
        }
        self.fired = true;

        let route = match mode {
            SessionMode::Generate => {
                info!("generation call finished");
                Route::Home
            }
            SessionMode::Interview(context) => self.request_feedback(context, transcript).await,
        };

        info!(path = %route.path(), "navigating after call");
        self.navigator.navigate(&route);
        Some(route)
    }

    async fn request_feedback(
        &self,
        context: &InterviewContext,
        transcript: &[TranscriptEntry],
    ) -> Route {
        let request = FeedbackRequest {
            interview_id: context.interview_id.to_string(),
            user_id: self.user_id.clone(),
            transcript: transcript.to_vec(),
            feedback_id: context.feedback_id.map(|id| id.to_string()),
        };
        info!(
            interview_id = %request.interview_id,
            turns = request.transcript.len(),
            "requesting interview feedback"
        );

        match self.service.create_feedback(&request).await {
            Ok(FeedbackResponse {
                success: true,
                feedback_id: Some(feedback_id),
                ..
            }) if !feedback_id.is_empty() => Route::Feedback {
                interview_id: request.interview_id,
                feedback_id,
            },
            Ok(response) => {
                error!(
                    interview_id = %request.interview_id,
                    error = response.error.as_deref().unwrap_or("no feedback id returned"),
                    "feedback generation failed"
                );
                Route::Home
            }
            Err(e) => {
                error!(interview_id = %request.interview_id, error = %e, "feedback request failed");
                Route::Home
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{interview_id, RecordingFeedback, RecordingNavigator, INTERVIEW_ID};
    use crate::transcript::Role;

    fn interview() -> SessionMode {
        SessionMode::Interview(InterviewContext {
            interview_id: interview_id(),
            questions: vec!["Tell me about yourself".to_string()],
            feedback_id: None,
        })
    }

    fn transcript() -> Vec<TranscriptEntry> {
        vec![TranscriptEntry {
            role: Role::Assistant,
            content: "Welcome".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_fires_once() {
        let feedback = Arc::new(RecordingFeedback::succeeding("fb-1"));
        let navigator = Arc::new(RecordingNavigator::default());
        let mut trigger = FeedbackTrigger::new(feedback.clone(), navigator.clone(), "u1");

        let first = trigger.on_finished(&interview(), &transcript()).await;
        let second = trigger.on_finished(&interview(), &transcript()).await;

        assert_eq!(
            first,
            Some(Route::Feedback {
                interview_id: INTERVIEW_ID.to_string(),
                feedback_id: "fb-1".to_string()
            })
        );
        assert_eq!(second, None);
        assert!(trigger.has_fired());
        assert_eq!(feedback.calls().len(), 1);
        assert_eq!(feedback.calls()[0].user_id, "u1");
        assert_eq!(navigator.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_mode_skips_feedback() {
        let feedback = Arc::new(RecordingFeedback::succeeding("fb-1"));
        let navigator = Arc::new(RecordingNavigator::default());
        let mut trigger = FeedbackTrigger::new(feedback.clone(), navigator.clone(), "u1");

        let route = trigger.on_finished(&SessionMode::Generate, &transcript()).await;

        assert_eq!(route, Some(Route::Home));
        assert!(feedback.calls().is_empty());
        assert_eq!(navigator.routes(), vec![Route::Home]);
    }

    #[tokio::test]
    async fn test_failure_or_missing_id_routes_home() {
        for feedback in [RecordingFeedback::failing(), RecordingFeedback::without_id()] {
            let navigator = Arc::new(RecordingNavigator::default());
            let mut trigger = FeedbackTrigger::new(Arc::new(feedback), navigator.clone(), "u1");
            let route = trigger.on_finished(&interview(), &transcript()).await;
            assert_eq!(route, Some(Route::Home));
            assert_eq!(navigator.routes(), vec![Route::Home]);
        }
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Home.path(), "/");
        let route = Route::Feedback {
            interview_id: "iv-1".to_string(),
            feedback_id: "fb-9".to_string(),
        };
        assert_eq!(route.path(), "/interview/iv-1/feedback/fb-9");
    }
}
