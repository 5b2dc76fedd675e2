//! Feedback generation: score a transcript against the five-category rubric.
//!
//! The model's draft is validated in full before anything is written, so a
//! malformed reply never leaves a partial record behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::feedback::prompts::{FEEDBACK_PROMPT_TEMPLATE, FEEDBACK_SYSTEM_ROLE};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{complete_json, LanguageModel, LlmError};
use crate::models::feedback::{Category, CategoryScore, FeedbackRow, NewFeedback};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CreateFeedbackParams {
    pub interview_id: Uuid,
    pub user_id: String,
    pub transcript: Vec<TranscriptLine>,
    /// Overwrite this record instead of creating a new one.
    pub feedback_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("{0}")]
    Invalid(String),

    #[error("Interview {0} not found")]
    InterviewNotFound(Uuid),

    #[error("Feedback {0} belongs to a different user or interview")]
    Forbidden(Uuid),

    #[error("Failed to generate feedback: {0}")]
    Model(#[from] LlmError),

    #[error("Model returned invalid feedback: {0}")]
    Schema(String),

    #[error("Failed to save feedback: {0}")]
    Database(#[from] sqlx::Error),
}

/// The model's reply, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackDraft {
    total_score: f64,
    category_scores: Vec<DraftCategory>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    areas_for_improvement: Vec<String>,
    final_assessment: String,
}

#[derive(Debug, Deserialize)]
struct DraftCategory {
    name: String,
    score: f64,
    #[serde(default)]
    comment: String,
}

/// Renders the transcript as `- role: content` lines.
pub fn format_transcript(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| format!("- {}: {}\n", line.role, line.content))
        .collect()
}

fn to_score(value: f64, field: &str) -> Result<u8, FeedbackError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(FeedbackError::Schema(format!(
            "{field} must be between 0 and 100, got {value}"
        )));
    }
    Ok(value.round() as u8)
}

fn validate_draft(
    draft: FeedbackDraft,
    interview_id: Uuid,
    user_id: String,
) -> Result<NewFeedback, FeedbackError> {
    let total_score = to_score(draft.total_score, "totalScore")?;

    if draft.category_scores.len() != Category::ALL.len() {
        return Err(FeedbackError::Schema(format!(
            "expected {} category scores, got {}",
            Category::ALL.len(),
            draft.category_scores.len()
        )));
    }

    let mut category_scores: Vec<CategoryScore> = Vec::with_capacity(Category::ALL.len());
    for entry in draft.category_scores {
        let name = Category::parse(&entry.name)
            .ok_or_else(|| FeedbackError::Schema(format!("unknown category '{}'", entry.name)))?;
        if category_scores.iter().any(|c| c.name == name) {
            return Err(FeedbackError::Schema(format!(
                "category '{}' scored more than once",
                name.label()
            )));
        }
        category_scores.push(CategoryScore {
            name,
            score: to_score(entry.score, name.label())?,
            comment: entry.comment.trim().to_string(),
        });
    }
    category_scores.sort_by_key(|c| c.name);

    let final_assessment = draft.final_assessment.trim().to_string();
    if final_assessment.is_empty() {
        return Err(FeedbackError::Schema("finalAssessment is empty".to_string()));
    }

    Ok(NewFeedback {
        interview_id,
        user_id,
        total_score: i16::from(total_score),
        category_scores,
        strengths: draft.strengths,
        areas_for_improvement: draft.areas_for_improvement,
        final_assessment,
    })
}

/// Scores the transcript and writes the feedback record.
pub async fn create_feedback(
    store: &dyn Store,
    model: &dyn LanguageModel,
    params: CreateFeedbackParams,
) -> Result<FeedbackRow, FeedbackError> {
    if params.transcript.is_empty() {
        return Err(FeedbackError::Invalid("transcript is empty".to_string()));
    }
    if params.user_id.trim().is_empty() {
        return Err(FeedbackError::Invalid("userId is required".to_string()));
    }

    store
        .get_interview(params.interview_id)
        .await?
        .ok_or(FeedbackError::InterviewNotFound(params.interview_id))?;

    let feedback_id = match params.feedback_id {
        Some(id) => {
            if let Some(existing) = store.get_feedback(id).await? {
                if existing.user_id != params.user_id || existing.interview_id != params.interview_id
                {
                    warn!(
                        "Refusing to overwrite feedback {id} owned by {} for interview {}",
                        existing.user_id, existing.interview_id
                    );
                    return Err(FeedbackError::Forbidden(id));
                }
            }
            id
        }
        None => Uuid::new_v4(),
    };

    let prompt =
        FEEDBACK_PROMPT_TEMPLATE.replace("{transcript}", &format_transcript(&params.transcript));
    let draft: FeedbackDraft =
        complete_json(model, &prompt, &json_system(FEEDBACK_SYSTEM_ROLE)).await?;

    let feedback = validate_draft(draft, params.interview_id, params.user_id)?;
    // The write re-checks ownership; the record may have been claimed while
    // the model was scoring.
    let row = store
        .upsert_feedback(feedback_id, feedback)
        .await?
        .ok_or_else(|| {
            warn!("Feedback {feedback_id} was claimed by another interview or user");
            FeedbackError::Forbidden(feedback_id)
        })?;

    info!(
        "Saved feedback {} for interview {} (total score {})",
        row.id, row.interview_id, row.total_score
    );
    Ok(row)
}
