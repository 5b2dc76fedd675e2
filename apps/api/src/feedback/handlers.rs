//! Axum route handlers for feedback creation and lookup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::feedback::generator::{
    create_feedback, CreateFeedbackParams, FeedbackError, TranscriptLine,
};
use crate::models::feedback::FeedbackRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub interview_id: Uuid,
    pub user_id: String,
    #[serde(default)]
    pub transcript: Vec<TranscriptLine>,
    #[serde(default)]
    pub feedback_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateFeedbackResponse {
    fn failed(status: StatusCode, error: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                success: false,
                feedback_id: None,
                error: Some(error.into()),
            }),
        )
            .into_response()
    }
}

fn status_for(err: &FeedbackError) -> StatusCode {
    match err {
        FeedbackError::Invalid(_) => StatusCode::BAD_REQUEST,
        FeedbackError::InterviewNotFound(_) => StatusCode::NOT_FOUND,
        FeedbackError::Forbidden(_) => StatusCode::FORBIDDEN,
        FeedbackError::Model(_) | FeedbackError::Schema(_) => StatusCode::BAD_GATEWAY,
        FeedbackError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/v1/feedback
///
/// Scores a finished interview's transcript. `userId` must be the signed-in user.
pub async fn handle_create_feedback(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateFeedbackRequest>,
) -> Result<Response, AppError> {
    if request.user_id != user.id {
        warn!(
            "User {} attempted to create feedback as {}",
            user.id, request.user_id
        );
        return Err(AppError::Forbidden);
    }

    let params = CreateFeedbackParams {
        interview_id: request.interview_id,
        user_id: request.user_id,
        transcript: request.transcript,
        feedback_id: request.feedback_id,
    };

    let response = match create_feedback(state.store.as_ref(), state.llm.as_ref(), params).await {
        Ok(row) => Json(CreateFeedbackResponse {
            success: true,
            feedback_id: Some(row.id),
            error: None,
        })
        .into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Feedback generation failed: {e}");
            } else {
                warn!("Feedback request rejected: {e}");
            }
            CreateFeedbackResponse::failed(status, e.to_string())
        }
    };
    Ok(response)
}

/// GET /api/v1/interviews/:id/feedback
///
/// The signed-in user's most recent feedback for this interview.
pub async fn handle_feedback_for_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<FeedbackRow>, AppError> {
    state
        .store
        .feedback_for(interview_id, &user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Feedback is not available for this interview".into()))
}

/// GET /api/v1/feedback/:id
///
/// Other users' feedback is reported as not found rather than forbidden.
pub async fn handle_get_feedback(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackRow>, AppError> {
    state
        .store
        .get_feedback(id)
        .await?
        .filter(|row| row.user_id == user.id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Feedback {id} is not available")))
}
