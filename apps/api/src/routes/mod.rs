pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::feedback::handlers as feedback;
use crate::interviews::handlers as interviews;
use crate::state::AppState;
use crate::webhook::handlers as webhook;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Voice provider endpoints
        .route(
            "/api/vapi/generate",
            get(interviews::handle_generate_probe).post(interviews::handle_generate),
        )
        .route(
            "/api/vapi/webhook",
            get(webhook::handle_webhook_probe).post(webhook::handle_webhook),
        )
        // Interviews
        .route("/api/v1/interviews", get(interviews::handle_list_interviews))
        .route(
            "/api/v1/interviews/latest",
            get(interviews::handle_latest_interviews),
        )
        .route("/api/v1/interviews/:id", get(interviews::handle_get_interview))
        .route(
            "/api/v1/interviews/:id/feedback",
            get(feedback::handle_feedback_for_interview),
        )
        // Feedback
        .route("/api/v1/feedback", post(feedback::handle_create_feedback))
        .route("/api/v1/feedback/:id", get(feedback::handle_get_feedback))
        // Auth
        .route("/api/v1/auth/sign-up", post(auth::handle_sign_up))
        .route("/api/v1/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/v1/auth/sign-out", post(auth::handle_sign_out))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .with_state(state)
}
