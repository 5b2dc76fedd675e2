// Post-interview feedback: transcript scoring against the fixed rubric,
// persistence and lookup. All LLM calls go through llm_client.

pub mod generator;
pub mod handlers;
pub mod prompts;
