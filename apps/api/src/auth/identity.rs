use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The account an ID token was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid or expired ID token")]
    InvalidToken,

    #[error("Identity provider error (status {status}): {message}")]
    Provider { status: u16, message: String },
}

/// Verifies client-side ID tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// Firebase Auth over its REST API.
pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

impl FirebaseIdentity {
    pub fn new(project_id: String, api_key: String) -> Result<Self, IdentityError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            project_id,
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        if id_token.trim().is_empty() {
            return Err(IdentityError::InvalidToken);
        }

        let response = self
            .client
            .post(LOOKUP_URL)
            .query(&[("key", self.api_key.as_str())])
            .header("x-goog-user-project", &self.project_id)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 {
            // INVALID_ID_TOKEN, TOKEN_EXPIRED, USER_NOT_FOUND all land here
            return Err(IdentityError::InvalidToken);
        }
        if !status.is_success() {
            return Err(IdentityError::Provider {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let lookup: LookupResponse = response.json().await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(IdentityError::InvalidToken)?;

        debug!("Verified ID token for uid {}", user.local_id);
        Ok(VerifiedIdentity {
            uid: user.local_id,
            email: user.email,
        })
    }
}
