// Interview generation and lookup.
// Question generation goes through llm_client; no direct provider calls here.

pub mod covers;
pub mod generator;
pub mod handlers;
pub mod prompts;
