//! Client for the API server's feedback endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::transcript::TranscriptEntry;

// Feedback generation is a full model round-trip on the server.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub interview_id: String,
    pub user_id: String,
    pub transcript: Vec<TranscriptEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    #[serde(default)]
    pub feedback_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feedback service returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Creates feedback for a finished interview.
#[async_trait]
pub trait FeedbackService: Send + Sync {
    async fn create_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, FeedbackError>;
}

/// Posts the transcript to `POST {api}/api/v1/feedback`, authenticated with
/// the user's session cookie.
pub struct HttpFeedbackClient {
    client: Client,
    endpoint: String,
    session_token: Option<String>,
}

impl HttpFeedbackClient {
    pub fn new(api_base_url: &str, session_token: Option<String>) -> Result<Self, FeedbackError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/v1/feedback", api_base_url.trim_end_matches('/')),
            session_token,
        })
    }
}

#[async_trait]
impl FeedbackService for HttpFeedbackClient {
    async fn create_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, FeedbackError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.session_token {
            builder = builder.header(header::COOKIE, format!("session={token}"));
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, "feedback endpoint responded");

        match serde_json::from_str::<FeedbackResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(FeedbackError::Api {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(FeedbackError::Api {
                status: status.as_u16(),
                message: format!("unreadable response body: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = FeedbackRequest {
            interview_id: "iv-1".to_string(),
            user_id: "u1".to_string(),
            transcript: vec![TranscriptEntry {
                role: Role::User,
                content: "Hi".to_string(),
            }],
            feedback_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["interviewId"], "iv-1");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["transcript"][0]["role"], "user");
        assert!(value.get("feedbackId").is_none());
    }

    #[test]
    fn test_failure_body_parses() {
        let parsed: FeedbackResponse =
            serde_json::from_str(r#"{"success":false,"error":"model output invalid"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.feedback_id, None);
        assert_eq!(parsed.error.as_deref(), Some("model output invalid"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = HttpFeedbackClient::new("http://localhost:8080/", None).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/api/v1/feedback");
    }
}
