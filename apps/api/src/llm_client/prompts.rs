// Shared prompt constants.
// Each module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Builds a system prompt from a role description plus the JSON-only rules.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}
