//! Persistence seam.
//!
//! Handlers reach the database only through [`Store`]. `PgStore` is the
//! production implementation; tests use the in-memory `MemoryStore`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::feedback::{FeedbackRow, NewFeedback};
use crate::models::interview::{InterviewRow, NewInterview};
use crate::models::user::{NewUser, SessionRow, UserRow};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub type StoreResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait Store: Send + Sync {
    // Interviews
    async fn insert_interview(&self, interview: NewInterview) -> StoreResult<InterviewRow>;
    async fn get_interview(&self, id: Uuid) -> StoreResult<Option<InterviewRow>>;
    /// A user's own interviews, newest first.
    async fn interviews_by_user(&self, user_id: &str) -> StoreResult<Vec<InterviewRow>>;
    /// Finalized interviews created by anyone other than `exclude_user_id`,
    /// newest first.
    async fn latest_interviews(
        &self,
        exclude_user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<InterviewRow>>;

    // Feedback
    /// Inserts or fully replaces the record with this id. An existing record
    /// is only replaced when it belongs to the same interview and user;
    /// otherwise nothing is written and `None` is returned.
    async fn upsert_feedback(
        &self,
        id: Uuid,
        feedback: NewFeedback,
    ) -> StoreResult<Option<FeedbackRow>>;
    async fn get_feedback(&self, id: Uuid) -> StoreResult<Option<FeedbackRow>>;
    /// Most recent feedback for the pair.
    async fn feedback_for(
        &self,
        interview_id: Uuid,
        user_id: &str,
    ) -> StoreResult<Option<FeedbackRow>>;

    // Users & sessions
    async fn get_user(&self, id: &str) -> StoreResult<Option<UserRow>>;
    /// `None` when a user with this id already exists.
    async fn insert_user(&self, user: NewUser) -> StoreResult<Option<UserRow>>;
    async fn insert_session(&self, session: SessionRow) -> StoreResult<()>;
    /// Returns the session only if it has not expired.
    async fn find_session(&self, token: &str) -> StoreResult<Option<SessionRow>>;
    async fn delete_session(&self, token: &str) -> StoreResult<()>;
    /// Drops the user's expired sessions, returning how many were removed.
    async fn delete_expired_sessions(&self, user_id: &str) -> StoreResult<u64>;
}
