// LLM prompt constants for interview question generation.
// The JSON-only rules come from llm_client::prompts::json_system.

/// Role description for the question-generation system prompt.
pub const QUESTION_SYSTEM_ROLE: &str =
    "You are an experienced hiring manager preparing a spoken mock interview. \
    Your questions will be read aloud by a voice assistant.";

/// Question prompt template. Replace `{role}`, `{level}`, `{techstack}`,
/// `{type}` and `{amount}` before sending.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Prepare questions for a job interview.
The job role is {role}.
The job experience level is {level}.
The tech stack used in the job is: {techstack}.
The focus between behavioural and technical questions should lean towards: {type}.
The amount of questions required is: {amount}.

Rules:
- Return exactly {amount} questions.
- Return only the questions, without any additional text.
- The questions are going to be read by a voice assistant, so do not use "/" or "*" or any other special characters which might break the voice assistant.
- Each question must be a single plain sentence or two.

Return a JSON array of strings formatted like this:
["Question 1", "Question 2", "Question 3"]"#;
