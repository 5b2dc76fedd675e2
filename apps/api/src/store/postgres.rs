use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::models::feedback::{FeedbackRow, NewFeedback};
use crate::models::interview::{InterviewRow, NewInterview};
use crate::models::user::{NewUser, SessionRow, UserRow};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_interview(&self, interview: NewInterview) -> StoreResult<InterviewRow> {
        let row = sqlx::query_as::<_, InterviewRow>(
            r#"
            INSERT INTO interviews
                (id, user_id, role, level, interview_type, tech_stack,
                 question_count, questions, finalized, cover_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&interview.user_id)
        .bind(&interview.role)
        .bind(&interview.level)
        .bind(&interview.interview_type)
        .bind(&interview.tech_stack)
        .bind(interview.question_count)
        .bind(&interview.questions)
        .bind(interview.finalized)
        .bind(&interview.cover_image)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted interview {} for user {}", row.id, row.user_id);
        Ok(row)
    }

    async fn get_interview(&self, id: Uuid) -> StoreResult<Option<InterviewRow>> {
        sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn interviews_by_user(&self, user_id: &str) -> StoreResult<Vec<InterviewRow>> {
        sqlx::query_as::<_, InterviewRow>(
            "SELECT * FROM interviews WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn latest_interviews(
        &self,
        exclude_user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<InterviewRow>> {
        sqlx::query_as::<_, InterviewRow>(
            r#"
            SELECT * FROM interviews
            WHERE finalized AND user_id <> $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(exclude_user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn upsert_feedback(
        &self,
        id: Uuid,
        feedback: NewFeedback,
    ) -> StoreResult<Option<FeedbackRow>> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            r#"
            INSERT INTO feedback
                (id, interview_id, user_id, total_score, category_scores,
                 strengths, areas_for_improvement, final_assessment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                interview_id = EXCLUDED.interview_id,
                user_id = EXCLUDED.user_id,
                total_score = EXCLUDED.total_score,
                category_scores = EXCLUDED.category_scores,
                strengths = EXCLUDED.strengths,
                areas_for_improvement = EXCLUDED.areas_for_improvement,
                final_assessment = EXCLUDED.final_assessment,
                created_at = now()
            WHERE feedback.user_id = EXCLUDED.user_id
              AND feedback.interview_id = EXCLUDED.interview_id
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(feedback.interview_id)
        .bind(&feedback.user_id)
        .bind(feedback.total_score)
        .bind(Json(&feedback.category_scores))
        .bind(&feedback.strengths)
        .bind(&feedback.areas_for_improvement)
        .bind(&feedback.final_assessment)
        .fetch_optional(&self.pool)
        .await?;

        match &row {
            Some(row) => debug!("Upserted feedback {} for interview {}", row.id, row.interview_id),
            None => debug!("Feedback {id} belongs to another interview or user; left untouched"),
        }
        Ok(row)
    }

    async fn get_feedback(&self, id: Uuid) -> StoreResult<Option<FeedbackRow>> {
        sqlx::query_as::<_, FeedbackRow>("SELECT * FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn feedback_for(
        &self,
        interview_id: Uuid,
        user_id: &str,
    ) -> StoreResult<Option<FeedbackRow>> {
        sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT * FROM feedback
            WHERE interview_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(interview_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_session(&self, session: SessionRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<SessionRow>> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, user_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= now()")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
