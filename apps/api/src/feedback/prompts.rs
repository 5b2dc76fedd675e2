// LLM prompt constants for feedback scoring.

/// Role description for the feedback system prompt.
pub const FEEDBACK_SYSTEM_ROLE: &str =
    "You are a professional interviewer analyzing a mock interview. \
    Your task is to evaluate the candidate based on structured categories.";

/// Feedback prompt template. Replace `{transcript}` before sending.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"You are an AI interviewer analyzing a mock interview. Evaluate the candidate based on structured categories. Be thorough and detailed in your analysis. Don't be lenient with the candidate. If there are mistakes or areas for improvement, point them out.

Transcript:
{transcript}

Score the candidate from 0 to 100 in the following areas. Do not add categories other than the ones provided, and include each exactly once:
- Communication Skills: Clarity, articulation, structured responses.
- Technical Knowledge: Understanding of key concepts for the role.
- Problem-Solving: Ability to analyze problems and propose solutions.
- Cultural & Role Fit: Alignment with company values and job role.
- Confidence & Clarity: Confidence in responses, engagement, and clarity.

Return a JSON object with this EXACT schema (no extra fields):
{
  "totalScore": 72,
  "categoryScores": [
    {"name": "Communication Skills", "score": 75, "comment": "..."},
    {"name": "Technical Knowledge", "score": 70, "comment": "..."},
    {"name": "Problem-Solving", "score": 68, "comment": "..."},
    {"name": "Cultural & Role Fit", "score": 80, "comment": "..."},
    {"name": "Confidence & Clarity", "score": 66, "comment": "..."}
  ],
  "strengths": ["..."],
  "areasForImprovement": ["..."],
  "finalAssessment": "..."
}"#;
