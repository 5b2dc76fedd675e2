use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRow {
    pub id: Uuid,
    pub user_id: String,
    pub role: String,
    pub level: String,
    #[serde(rename = "type")]
    pub interview_type: String,
    #[serde(rename = "techstack")]
    pub tech_stack: Vec<String>,
    /// Number of questions requested; `questions` may hold fewer.
    pub question_count: i32,
    pub questions: Vec<String>,
    pub finalized: bool,
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewInterview {
    pub user_id: String,
    pub role: String,
    pub level: String,
    pub interview_type: String,
    pub tech_stack: Vec<String>,
    pub question_count: i32,
    pub questions: Vec<String>,
    pub finalized: bool,
    pub cover_image: String,
}
