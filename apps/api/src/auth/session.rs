//! App session tokens and the `session` cookie.
//!
//! A token is opaque: 64 hex characters from two v4 UUIDs. The server keeps
//! the authoritative copy with its expiry; the cookie only carries it.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{SessionRow, UserRow};
use crate::state::AppState;
use crate::store::{Store, StoreResult};

pub const SESSION_COOKIE: &str = "session";
/// One week.
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7;

pub fn new_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Mints a session for `user_id` and persists it. Returns the token.
///
/// The user's expired sessions are swept first so the table does not grow
/// with every sign-in.
pub async fn issue_session(store: &dyn Store, user_id: &str) -> StoreResult<String> {
    let swept = store.delete_expired_sessions(user_id).await?;
    if swept > 0 {
        debug!("Removed {swept} expired session(s) for user {user_id}");
    }

    let now = Utc::now();
    let token = new_session_token();
    store
        .insert_session(SessionRow {
            token: token.clone(),
            user_id: user_id.to_string(),
            expires_at: now + Duration::seconds(SESSION_TTL_SECS),
            created_at: now,
        })
        .await?;
    Ok(token)
}

pub fn session_cookie(token: &str, secure: bool) -> String {
    build_cookie(token, SESSION_TTL_SECS, secure)
}

/// A cookie that makes the browser discard the session.
pub fn expired_session_cookie(secure: bool) -> String {
    build_cookie("", 0, secure)
}

fn build_cookie(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Reads the session token from the request's `Cookie` headers.
pub fn read_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The signed-in user. Extracting it fails with 401 when the request has no
/// live session.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl From<UserRow> for CurrentUser {
    fn from(user: UserRow) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = read_session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let session = state
            .store
            .find_session(&token)
            .await?
            .filter(|s| s.expires_at > Utc::now())
            .ok_or(AppError::Unauthorized)?;
        let user = state
            .store
            .get_user(&session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(user.into())
    }
}
