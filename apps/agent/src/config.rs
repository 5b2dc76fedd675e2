use uuid::Uuid;

use crate::channel::CallTarget;
use crate::session::{SessionError, SessionMode};

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_VOICE_API_URL: &str = "https://api.vapi.ai";

/// Voice-channel credentials and service endpoints for the agent.
///
/// Loading never fails: missing credentials surface as a configuration error
/// when a call is started, not when the agent is built.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub web_token: Option<String>,
    pub workflow_id: Option<String>,
    pub assistant_id: Option<String>,
    pub api_base_url: String,
    pub voice_api_url: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            web_token: None,
            workflow_id: None,
            assistant_id: None,
            api_base_url: DEFAULT_API_URL.to_string(),
            voice_api_url: DEFAULT_VOICE_API_URL.to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self {
            web_token: optional_env("VAPI_WEB_TOKEN"),
            workflow_id: optional_env("VAPI_WORKFLOW_ID"),
            assistant_id: optional_env("VAPI_ASSISTANT_ID"),
            api_base_url: optional_env("MOCKLINE_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            voice_api_url: optional_env("VAPI_API_URL")
                .unwrap_or_else(|| DEFAULT_VOICE_API_URL.to_string()),
        }
    }

    /// Resolves the call target for `mode`, checking that the web token is set
    /// and that the mode's identifier is a canonical hyphenated UUID.
    pub fn target_for(&self, mode: &SessionMode) -> Result<CallTarget, SessionError> {
        if self.web_token.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(SessionError::Configuration(
                "VAPI_WEB_TOKEN is not set".to_string(),
            ));
        }

        match mode {
            SessionMode::Generate => {
                validated_identifier("VAPI_WORKFLOW_ID", self.workflow_id.as_deref())
                    .map(CallTarget::Workflow)
            }
            SessionMode::Interview(_) => {
                validated_identifier("VAPI_ASSISTANT_ID", self.assistant_id.as_deref())
                    .map(CallTarget::Assistant)
            }
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn validated_identifier(name: &str, value: Option<&str>) -> Result<String, SessionError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SessionError::Configuration(format!("{name} is not set")))?;

    // Uuid::try_parse also accepts simple, braced and urn forms; only the
    // 36-character hyphenated form is valid here.
    if value.len() != 36 || Uuid::try_parse(value).is_err() {
        return Err(SessionError::Configuration(format!(
            "{name} is not a valid identifier (expected a hyphenated UUID)"
        )));
    }
    Ok(value.to_string())
}
