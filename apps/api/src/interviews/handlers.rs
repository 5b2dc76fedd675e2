//! Axum route handlers for interview generation and lookup.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::interviews::generator::{generate_interview, InterviewParams, REQUIRED_FIELDS};
use crate::models::interview::InterviewRow;
use crate::state::AppState;

pub const DEFAULT_LATEST_LIMIT: i64 = 20;
const MAX_LATEST_LIMIT: i64 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub interview_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<i64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/vapi/generate
///
/// Called by the voice workflow once it has collected the interview details.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<InterviewParams>, JsonRejection>,
) -> Response {
    let Json(params) = match payload {
        Ok(params) => params,
        Err(rejection) => {
            warn!("Unreadable generate request: {}", rejection.body_text());
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", rejection.body_text()),
            );
        }
    };

    let missing = params.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "Generate request missing parameters");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Missing required parameters",
                "required": REQUIRED_FIELDS,
            })),
        )
            .into_response();
    }

    let spec = match params.into_spec() {
        Ok(spec) => spec,
        Err(e) => {
            warn!("Rejected generate request: {e}");
            return failure(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match generate_interview(state.store.as_ref(), state.llm.as_ref(), spec).await {
        Ok(row) => Json(GenerateResponse {
            success: true,
            interview_id: row.id,
            message: format!(
                "Interview generated successfully with {} questions",
                row.questions.len()
            ),
        })
        .into_response(),
        Err(e) if e.is_client_error() => failure(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            error!("Interview generation failed: {e}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn failure(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

/// GET /api/vapi/generate
pub async fn handle_generate_probe() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": "Thank you" }))
}

/// GET /api/v1/interviews
///
/// The signed-in user's own interviews, newest first.
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    Ok(Json(state.store.interviews_by_user(&user.id).await?))
}

/// GET /api/v1/interviews/latest?limit=
///
/// Finalized interviews created by other users, newest first.
pub async fn handle_latest_interviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_LIMIT);
    if !(1..=MAX_LATEST_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LATEST_LIMIT}"
        )));
    }
    Ok(Json(state.store.latest_interviews(&user.id, limit).await?))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewRow>, AppError> {
    state
        .store
        .get_interview(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} is not available")))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};

    use crate::models::interview::NewInterview;
    use crate::store::Store;
    use crate::testing::{questions_reply, raw_request, request, send, sign_in_as, TestApp};

    fn generate_body() -> Value {
        json!({
            "type": "Technical",
            "role": "Frontend Developer",
            "level": "junior",
            "techstack": "React,TypeScript,Next.js",
            "amount": 5,
            "userid": "u1"
        })
    }

    fn interview(user_id: &str, finalized: bool) -> NewInterview {
        NewInterview {
            user_id: user_id.to_string(),
            role: "Backend Developer".to_string(),
            level: "senior".to_string(),
            interview_type: "Mixed".to_string(),
            tech_stack: vec!["Rust".to_string()],
            question_count: 1,
            questions: vec!["Why Rust?".to_string()],
            finalized,
            cover_image: "/covers/adobe.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_endpoint_persists_interview() {
        let app = TestApp::with_replies([questions_reply(5)]);

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/vapi/generate", Some(generate_body()), None),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        let id = body["interviewId"].as_str().unwrap();
        assert!(!id.is_empty());

        let stored = app.store.all_interviews();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id.to_string(), id);
        assert_eq!(stored[0].questions.len(), 5);
        assert_eq!(
            body["message"],
            "Interview generated successfully with 5 questions"
        );
    }

    #[tokio::test]
    async fn test_generate_missing_amount_is_rejected() {
        let app = TestApp::with_replies([questions_reply(5)]);
        let mut body = generate_body();
        body.as_object_mut().unwrap().remove("amount");

        let (status, body) =
            send(&app, request(Method::POST, "/api/vapi/generate", Some(body), None)).await;

        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing required parameters");
        assert_eq!(
            body["required"],
            json!(["type", "role", "level", "techstack", "amount", "userid"])
        );
        assert_eq!(app.store.interview_count(), 0);
        assert_eq!(app.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_malformed_body_is_structured_400() {
        let app = TestApp::with_replies([questions_reply(5)]);

        for raw in [r#"{"type": "Technical", "role": "#, r#""just a string""#] {
            let (status, body) =
                send(&app, raw_request(Method::POST, "/api/vapi/generate", raw)).await;

            assert_eq!(status, 400);
            assert_eq!(body["success"], false);
            assert!(body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request body"));
        }
        assert_eq!(app.model.call_count(), 0);
        assert_eq!(app.store.interview_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_model_failure_is_500() {
        let app = TestApp::with_replies(["not json at all"]);

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/vapi/generate", Some(generate_body()), None),
        )
        .await;

        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("generate"));
        assert_eq!(app.store.interview_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_probe() {
        let app = TestApp::new();
        let (status, body) =
            send(&app, request(Method::GET, "/api/vapi/generate", None, None)).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"success": true, "data": "Thank you"}));
    }

    #[tokio::test]
    async fn test_latest_excludes_caller_and_drafts() {
        let app = TestApp::new();
        let token = sign_in_as(&app, "me").await;
        app.store.insert_interview(interview("me", true)).await.unwrap();
        app.store.insert_interview(interview("other", false)).await.unwrap();
        let older = app.store.insert_interview(interview("other", true)).await.unwrap();
        let newer = app.store.insert_interview(interview("third", true)).await.unwrap();

        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/interviews/latest", None, Some(&token)),
        )
        .await;

        assert_eq!(status, 200);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![newer.id.to_string(), older.id.to_string()]);
    }

    #[tokio::test]
    async fn test_latest_rejects_bad_limit() {
        let app = TestApp::new();
        let token = sign_in_as(&app, "me").await;
        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/interviews/latest?limit=0", None, Some(&token)),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_list_requires_session() {
        let app = TestApp::new();
        let (status, body) =
            send(&app, request(Method::GET, "/api/v1/interviews", None, None)).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_list_returns_own_interviews() {
        let app = TestApp::new();
        let token = sign_in_as(&app, "me").await;
        let mine = app.store.insert_interview(interview("me", false)).await.unwrap();
        app.store.insert_interview(interview("other", true)).await.unwrap();

        let (status, body) =
            send(&app, request(Method::GET, "/api/v1/interviews", None, Some(&token))).await;

        assert_eq!(status, 200);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], mine.id.to_string());
        assert_eq!(rows[0]["techstack"], json!(["Rust"]));
        assert_eq!(rows[0]["type"], "Mixed");
    }

    #[tokio::test]
    async fn test_get_unknown_interview_is_404() {
        let app = TestApp::new();
        let uri = format!("/api/v1/interviews/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, 404);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("not available"));
    }
}
