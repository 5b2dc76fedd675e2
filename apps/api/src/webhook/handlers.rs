//! POST/GET /api/vapi/webhook
//!
//! The voice workflow calls `generateInterview` as a server-side function.
//! Replies always carry HTTP 200 with the outcome inside `result`, which is
//! what the voice agent reads back to the caller.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::interviews::generator::{generate_interview, InterviewParams};
use crate::state::AppState;

const GENERATE_INTERVIEW: &str = "generateInterview";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub message: Option<WebhookMessage>,
    #[serde(default)]
    pub call: Option<CallUpdate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct CallUpdate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// POST /api/vapi/webhook
pub async fn handle_webhook(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let parsed = body
        .map_err(|rejection| rejection.body_text())
        .and_then(|Json(body)| {
            serde_json::from_value::<WebhookPayload>(body).map_err(|e| e.to_string())
        });
    let payload = match parsed {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Unreadable webhook payload: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Webhook processing failed" })),
            );
        }
    };

    if let Some(call) = payload
        .message
        .as_ref()
        .filter(|m| m.kind == "function-call")
        .and_then(|m| m.function_call.as_ref())
    {
        let result = run_function(&state, call).await;
        return (StatusCode::OK, Json(json!({ "result": result })));
    }

    if let Some(call) = &payload.call {
        info!(
            call_id = call.id.as_deref().unwrap_or("unknown"),
            "Call status: {}",
            call.status.as_deref().unwrap_or("unknown")
        );
    }

    (StatusCode::OK, Json(json!({ "received": true })))
}

async fn run_function(state: &AppState, call: &FunctionCall) -> Value {
    if call.name != GENERATE_INTERVIEW {
        warn!("Webhook called unknown function '{}'", call.name);
        return json!({
            "success": false,
            "error": format!("Unknown function: {}", call.name),
        });
    }

    let params: InterviewParams = match serde_json::from_value(call.parameters.clone()) {
        Ok(params) => params,
        Err(e) => {
            warn!("Unreadable generateInterview parameters: {e}");
            return json!({ "success": false, "error": "Invalid function parameters" });
        }
    };

    let spec = match params.into_spec() {
        Ok(spec) => spec,
        Err(e) => {
            warn!("Rejected generateInterview call: {e}");
            return json!({ "success": false, "error": e.to_string() });
        }
    };
    let (interview_type, level, role) = (
        spec.interview_type.clone(),
        spec.level.clone(),
        spec.role.clone(),
    );

    match generate_interview(state.store.as_ref(), state.llm.as_ref(), spec).await {
        Ok(row) => {
            let count = row.questions.len();
            json!({
                "success": true,
                "interviewId": row.id,
                "questionsGenerated": count,
                "message": format!(
                    "Great! I've generated {count} {interview_type} interview questions for a {level} {role} position. \
                     The interview has been saved and you can access it from your dashboard."
                ),
            })
        }
        Err(e) if e.is_client_error() => {
            json!({ "success": false, "error": e.to_string() })
        }
        Err(e) => {
            error!("generateInterview failed: {e}");
            json!({
                "success": false,
                "error": "Failed to generate interview questions. Please try again.",
            })
        }
    }
}

/// GET /api/vapi/webhook
pub async fn handle_webhook_probe() -> Json<Value> {
    Json(json!({
        "message": "Webhook endpoint is active",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
