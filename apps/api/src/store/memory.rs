use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::models::feedback::{FeedbackRow, NewFeedback};
use crate::models::interview::{InterviewRow, NewInterview};
use crate::models::user::{NewUser, SessionRow, UserRow};

/// In-process store for handler and generator tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    // Insertion order doubles as the tiebreak for equal timestamps.
    interviews: Vec<InterviewRow>,
    feedback: Vec<FeedbackRow>,
    users: HashMap<String, UserRow>,
    sessions: HashMap<String, SessionRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interview_count(&self) -> usize {
        self.lock().interviews.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.lock().feedback.len()
    }

    pub fn all_interviews(&self) -> Vec<InterviewRow> {
        self.lock().interviews.clone()
    }

    /// Stored sessions, expired ones included.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn newest_first(mut rows: Vec<InterviewRow>) -> Vec<InterviewRow> {
    rows.reverse();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_interview(&self, interview: NewInterview) -> StoreResult<InterviewRow> {
        let row = InterviewRow {
            id: Uuid::new_v4(),
            user_id: interview.user_id,
            role: interview.role,
            level: interview.level,
            interview_type: interview.interview_type,
            tech_stack: interview.tech_stack,
            question_count: interview.question_count,
            questions: interview.questions,
            finalized: interview.finalized,
            cover_image: interview.cover_image,
            created_at: Utc::now(),
        };
        self.lock().interviews.push(row.clone());
        Ok(row)
    }

    async fn get_interview(&self, id: Uuid) -> StoreResult<Option<InterviewRow>> {
        Ok(self.lock().interviews.iter().find(|i| i.id == id).cloned())
    }

    async fn interviews_by_user(&self, user_id: &str) -> StoreResult<Vec<InterviewRow>> {
        let rows = self
            .lock()
            .interviews
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn latest_interviews(
        &self,
        exclude_user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<InterviewRow>> {
        let rows = self
            .lock()
            .interviews
            .iter()
            .filter(|i| i.finalized && i.user_id != exclude_user_id)
            .cloned()
            .collect();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(newest_first(rows).into_iter().take(limit).collect())
    }

    async fn upsert_feedback(
        &self,
        id: Uuid,
        feedback: NewFeedback,
    ) -> StoreResult<Option<FeedbackRow>> {
        let mut tables = self.lock();
        if let Some(existing) = tables.feedback.iter().find(|f| f.id == id) {
            if existing.user_id != feedback.user_id
                || existing.interview_id != feedback.interview_id
            {
                return Ok(None);
            }
        }
        let row = FeedbackRow {
            id,
            interview_id: feedback.interview_id,
            user_id: feedback.user_id,
            total_score: feedback.total_score,
            category_scores: Json(feedback.category_scores),
            strengths: feedback.strengths,
            areas_for_improvement: feedback.areas_for_improvement,
            final_assessment: feedback.final_assessment,
            created_at: Utc::now(),
        };
        tables.feedback.retain(|f| f.id != id);
        tables.feedback.push(row.clone());
        Ok(Some(row))
    }

    async fn get_feedback(&self, id: Uuid) -> StoreResult<Option<FeedbackRow>> {
        Ok(self.lock().feedback.iter().find(|f| f.id == id).cloned())
    }

    async fn feedback_for(
        &self,
        interview_id: Uuid,
        user_id: &str,
    ) -> StoreResult<Option<FeedbackRow>> {
        Ok(self
            .lock()
            .feedback
            .iter()
            .rev()
            .find(|f| f.interview_id == interview_id && f.user_id == user_id)
            .cloned())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserRow>> {
        Ok(self.lock().users.get(id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<Option<UserRow>> {
        let mut tables = self.lock();
        if tables.users.contains_key(&user.id) {
            return Ok(None);
        }
        let row = UserRow {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: Utc::now(),
        };
        tables.users.insert(row.id.clone(), row.clone());
        Ok(Some(row))
    }

    async fn insert_session(&self, session: SessionRow) -> StoreResult<()> {
        self.lock().sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<SessionRow>> {
        Ok(self
            .lock()
            .sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.lock().sessions.remove(token);
        Ok(())
    }

    async fn delete_expired_sessions(&self, user_id: &str) -> StoreResult<u64> {
        let now = Utc::now();
        let mut tables = self.lock();
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, s| s.user_id != user_id || s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}
