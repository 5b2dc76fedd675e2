//! Interview generation: validate the request, ask the model for questions,
//! clean them up for speech, persist the interview.
//!
//! Nothing is written unless the model produced at least one usable question.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::interviews::covers::random_cover;
use crate::interviews::prompts::{QUESTION_PROMPT_TEMPLATE, QUESTION_SYSTEM_ROLE};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{complete_json, LanguageModel, LlmError};
use crate::models::interview::{InterviewRow, NewInterview};
use crate::store::Store;

pub const MAX_QUESTIONS: u32 = 20;

/// Field names a generate request must carry, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 6] = ["type", "role", "level", "techstack", "amount", "userid"];

/// Characters that trip up speech synthesis or render as markup.
const MARKUP_CHARS: &[char] = &['*', '#', '_', '`', '~', '<', '>', '[', ']', '{', '}', '|', '\\'];

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Missing required parameters: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to generate interview questions: {0}")]
    Model(#[from] LlmError),

    #[error("The model returned no usable questions")]
    NoQuestions,

    #[error("Failed to save interview: {0}")]
    Database(#[from] sqlx::Error),
}

impl GenerationError {
    /// True when the caller sent a bad request, as opposed to a downstream failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GenerationError::Missing(_) | GenerationError::Invalid(_))
    }
}

/// A fully validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewSpec {
    pub role: String,
    pub level: String,
    pub interview_type: String,
    pub tech_stack: Vec<String>,
    pub question_count: u32,
    pub owner_user_id: String,
}

impl InterviewSpec {
    pub fn validate(&self) -> Result<(), GenerationError> {
        let blanks: Vec<&'static str> = [
            (self.interview_type.as_str(), "type"),
            (self.role.as_str(), "role"),
            (self.level.as_str(), "level"),
            (self.owner_user_id.as_str(), "userid"),
        ]
        .into_iter()
        .filter(|(value, _)| value.trim().is_empty())
        .map(|(_, name)| name)
        .collect();
        if !blanks.is_empty() {
            return Err(GenerationError::Missing(blanks));
        }
        if self.tech_stack.iter().all(|t| t.trim().is_empty()) {
            return Err(GenerationError::Missing(vec!["techstack"]));
        }
        if !(1..=MAX_QUESTIONS).contains(&self.question_count) {
            return Err(amount_error());
        }
        Ok(())
    }
}

/// Loosely-typed request parameters, as sent by the voice workflow.
///
/// Voice tools are inconsistent about types: `amount` may arrive as `5` or
/// `"5"`, `techstack` as `"React,Go"` or `["React", "Go"]`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct InterviewParams {
    #[serde(default, rename = "type")]
    pub interview_type: Option<Value>,
    #[serde(default)]
    pub role: Option<Value>,
    #[serde(default)]
    pub level: Option<Value>,
    #[serde(default)]
    pub techstack: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, alias = "userId")]
    pub userid: Option<Value>,
}

impl InterviewParams {
    /// Required fields that are absent, null or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            &self.interview_type,
            &self.role,
            &self.level,
            &self.techstack,
            &self.amount,
            &self.userid,
        ]
        .into_iter()
        .zip(REQUIRED_FIELDS)
        .filter(|(value, _)| !is_present(value.as_ref()))
        .map(|(_, name)| name)
        .collect()
    }

    pub fn into_spec(self) -> Result<InterviewSpec, GenerationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(GenerationError::Missing(missing));
        }

        let spec = InterviewSpec {
            role: required_text(self.role.as_ref(), "role")?,
            level: required_text(self.level.as_ref(), "level")?,
            interview_type: required_text(self.interview_type.as_ref(), "type")?,
            tech_stack: parse_tech_stack(self.techstack.as_ref()),
            question_count: parse_amount(self.amount.as_ref())?,
            owner_user_id: required_text(self.userid.as_ref(), "userid")?,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        Some(Value::Array(items)) => !items.is_empty(),
        _ => false,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(value: Option<&Value>, field: &'static str) -> Result<String, GenerationError> {
    text(value).ok_or(GenerationError::Missing(vec![field]))
}

fn amount_error() -> GenerationError {
    GenerationError::Invalid(format!(
        "amount must be a whole number between 1 and {MAX_QUESTIONS}"
    ))
}

fn parse_amount(value: Option<&Value>) -> Result<u32, GenerationError> {
    let amount = match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    match amount {
        Some(n) if (1..=MAX_QUESTIONS).contains(&n) => Ok(n),
        _ => Err(amount_error()),
    }
}

fn parse_tech_stack(value: Option<&Value>) -> Vec<String> {
    let items: Vec<&str> = match value {
        Some(Value::String(s)) => s.split(',').collect(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Makes a question safe to read aloud: slashes become " or ", markup
/// characters are dropped and whitespace is collapsed.
pub fn sanitize_question(raw: &str) -> String {
    raw.replace('/', " or ")
        .chars()
        .filter(|c| !MARKUP_CHARS.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_prompt(spec: &InterviewSpec) -> String {
    QUESTION_PROMPT_TEMPLATE
        .replace("{role}", &spec.role)
        .replace("{level}", &spec.level)
        .replace("{techstack}", &spec.tech_stack.join(", "))
        .replace("{type}", &spec.interview_type)
        .replace("{amount}", &spec.question_count.to_string())
}

/// Generates and persists a finalized interview.
pub async fn generate_interview(
    store: &dyn Store,
    model: &dyn LanguageModel,
    spec: InterviewSpec,
) -> Result<InterviewRow, GenerationError> {
    spec.validate()?;

    let prompt = build_prompt(&spec);
    let raw: Vec<String> = complete_json(model, &prompt, &json_system(QUESTION_SYSTEM_ROLE)).await?;

    let requested = spec.question_count as usize;
    let mut questions: Vec<String> = raw
        .iter()
        .map(|q| sanitize_question(q))
        .filter(|q| !q.is_empty())
        .collect();

    if questions.is_empty() {
        warn!("Model returned no usable questions for {} {}", spec.level, spec.role);
        return Err(GenerationError::NoQuestions);
    }
    if questions.len() > requested {
        questions.truncate(requested);
    } else if questions.len() < requested {
        warn!(
            "Model returned {} of {} requested questions; keeping what we have",
            questions.len(),
            requested
        );
    }

    let row = store
        .insert_interview(NewInterview {
            user_id: spec.owner_user_id,
            role: spec.role,
            level: spec.level,
            interview_type: spec.interview_type,
            tech_stack: spec.tech_stack,
            question_count: spec.question_count as i32,
            questions,
            finalized: true,
            cover_image: random_cover(),
        })
        .await?;

    info!(
        "Generated interview {} with {} questions for user {}",
        row.id,
        row.questions.len(),
        row.user_id
    );
    Ok(row)
}
