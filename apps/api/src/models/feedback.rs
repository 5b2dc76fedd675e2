use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// The fixed five-category rubric, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Communication Skills")]
    CommunicationSkills,
    #[serde(rename = "Technical Knowledge")]
    TechnicalKnowledge,
    #[serde(rename = "Problem-Solving")]
    ProblemSolving,
    #[serde(rename = "Cultural & Role Fit")]
    CulturalFit,
    #[serde(rename = "Confidence & Clarity")]
    ConfidenceClarity,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::CommunicationSkills,
        Category::TechnicalKnowledge,
        Category::ProblemSolving,
        Category::CulturalFit,
        Category::ConfidenceClarity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::CommunicationSkills => "Communication Skills",
            Category::TechnicalKnowledge => "Technical Knowledge",
            Category::ProblemSolving => "Problem-Solving",
            Category::CulturalFit => "Cultural & Role Fit",
            Category::ConfidenceClarity => "Confidence & Clarity",
        }
    }

    /// Matches a category name loosely: case, spacing and punctuation are
    /// ignored, so "problem solving" and "Cultural and Role Fit" both resolve.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Category::ALL
            .into_iter()
            .find(|category| normalize(category.label()) == wanted)
    }
}

fn normalize(name: &str) -> String {
    name.replace('&', "and")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: Category,
    pub score: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRow {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: String,
    pub total_score: i16,
    pub category_scores: Json<Vec<CategoryScore>>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
    pub created_at: DateTime<Utc>,
}

/// Validated feedback ready to be written.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub interview_id: Uuid,
    pub user_id: String,
    pub total_score: i16,
    pub category_scores: Vec<CategoryScore>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
}
