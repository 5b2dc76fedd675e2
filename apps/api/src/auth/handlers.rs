//! Axum route handlers for sign-up, sign-in, sign-out and the current user.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::identity::{IdentityError, VerifiedIdentity};
use crate::auth::session::{
    expired_session_cookie, issue_session, read_session_token, session_cookie, CurrentUser,
};
use crate::errors::AppError;
use crate::models::user::NewUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub id_token: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

fn reply(status: StatusCode, success: bool, message: impl Into<String>) -> Response {
    (
        status,
        Json(AuthResponse {
            success,
            message: message.into(),
        }),
    )
        .into_response()
}

async fn verify(state: &AppState, id_token: &str) -> Result<VerifiedIdentity, AppError> {
    state
        .identity
        .verify_id_token(id_token)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidToken => AppError::Unauthorized,
            other => AppError::Upstream(other.to_string()),
        })
}

/// POST /api/v1/auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<Response, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let identity = verify(&state, &request.id_token).await?;

    let inserted = state
        .store
        .insert_user(NewUser {
            id: identity.uid,
            name: name.to_string(),
            email: identity.email.or(request.email),
        })
        .await?;
    let Some(user) = inserted else {
        return Ok(reply(
            StatusCode::CONFLICT,
            false,
            "User already exists. Please sign in instead.",
        ));
    };

    info!("Created account for user {}", user.id);
    Ok(reply(
        StatusCode::CREATED,
        true,
        "Account created successfully. Please sign in.",
    ))
}

/// POST /api/v1/auth/sign-in
///
/// Exchanges a verified ID token for a one-week app session cookie.
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Response, AppError> {
    let identity = verify(&state, &request.id_token).await?;

    if state.store.get_user(&identity.uid).await?.is_none() {
        warn!("Sign-in for unknown user {}", identity.uid);
        return Ok(reply(
            StatusCode::NOT_FOUND,
            false,
            "User does not exist. Create an account instead.",
        ));
    }

    let token = issue_session(state.store.as_ref(), &identity.uid).await?;
    info!("Issued session for user {}", identity.uid);

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.secure_cookies),
        )],
        Json(AuthResponse {
            success: true,
            message: "Signed in successfully.".to_string(),
        }),
    )
        .into_response())
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = read_session_token(&headers) {
        state.store.delete_session(&token).await?;
    }

    Ok((
        [(
            header::SET_COOKIE,
            expired_session_cookie(state.config.secure_cookies),
        )],
        Json(AuthResponse {
            success: true,
            message: "Signed out.".to_string(),
        }),
    )
        .into_response())
}

/// GET /api/v1/auth/me
pub async fn handle_me(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}
