//! Fakes and request helpers shared by the handler tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::identity::{IdentityError, IdentityProvider, VerifiedIdentity};
use crate::auth::session::issue_session;
use crate::config::Config;
use crate::llm_client::{LanguageModel, LlmError};
use crate::models::user::NewUser;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::memory::MemoryStore;
use crate::store::Store;

/// Replays scripted replies in order and records every prompt it was sent.
#[derive(Default)]
pub struct FakeModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::Api {
                status: 503,
                message: "no scripted reply".to_string(),
            })
    }
}

/// Accepts only tokens registered with [`FakeIdentity::allow`].
#[derive(Default)]
pub struct FakeIdentity {
    tokens: Mutex<HashMap<String, VerifiedIdentity>>,
}

impl FakeIdentity {
    pub fn allow(&self, token: &str, uid: &str, email: Option<&str>) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            VerifiedIdentity {
                uid: uid.to_string(),
                email: email.map(str::to_string),
            },
        );
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.tokens
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or(IdentityError::InvalidToken)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        anthropic_api_key: "test-key".to_string(),
        identity_project_id: "test-project".to_string(),
        identity_api_key: "test-identity-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        secure_cookies: false,
    }
}

/// An in-memory app with handles on each fake.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub model: Arc<FakeModel>,
    pub identity: Arc<FakeIdentity>,
    state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_replies(Vec::<String>::new())
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(FakeModel::replying(replies));
        let identity = Arc::new(FakeIdentity::default());
        let state = AppState {
            store: store.clone(),
            llm: model.clone(),
            identity: identity.clone(),
            config: test_config(),
        };
        Self {
            store,
            model,
            identity,
            state,
        }
    }
}

pub fn request(
    method: Method,
    uri: &str,
    body: Option<Value>,
    session: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A JSON-typed request whose body is sent exactly as given.
pub fn raw_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send_full(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = build_router(app.state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, headers, body)
}

pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_full(app, request).await;
    (status, body)
}

/// Creates the user if needed and returns a live session token.
pub async fn sign_in_as(app: &TestApp, user_id: &str) -> String {
    app.store
        .insert_user(NewUser {
            id: user_id.to_string(),
            name: format!("User {user_id}"),
            email: None,
        })
        .await
        .unwrap();
    issue_session(&*app.store, user_id).await.unwrap()
}

/// A model reply with `n` numbered questions.
pub fn questions_reply(n: usize) -> String {
    let questions: Vec<String> = (1..=n).map(|i| format!("Question {i}?")).collect();
    serde_json::to_string(&questions).unwrap()
}

/// A valid five-category feedback reply.
pub fn feedback_reply() -> String {
    json!({
        "totalScore": 74,
        "categoryScores": [
            {"name": "Communication Skills", "score": 78, "comment": "Clear and structured."},
            {"name": "Technical Knowledge", "score": 70, "comment": "Solid fundamentals."},
            {"name": "Problem-Solving", "score": 72, "comment": "Reasoned aloud well."},
            {"name": "Cultural & Role Fit", "score": 80, "comment": "Good alignment."},
            {"name": "Confidence & Clarity", "score": 69, "comment": "Some hesitation."}
        ],
        "strengths": ["Communication"],
        "areasForImprovement": ["System design depth"],
        "finalAssessment": "A promising junior candidate."
    })
    .to_string()
}
