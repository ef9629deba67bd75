//! Input relevance check — decides whether free text plausibly is a job
//! description, so a front end can warn before starting an interview.

use tracing::debug;

use crate::interview::prompts::RELEVANCE_PROMPT_TEMPLATE;
use crate::llm_client::LlmClient;

const MIN_INPUT_CHARS: usize = 20;

const JD_KEYWORDS: &[&str] = &[
    "engineer",
    "developer",
    "analyst",
    "manager",
    "lead",
    "senior",
    "junior",
    "data",
    "software",
    "role",
    "responsibilities",
    "requirements",
    "skills",
];

/// Cheap keyword heuristic first; only inputs the heuristic cannot accept
/// go to a single LLM yes/no probe. Fails closed on any invocation error.
pub async fn check_relevant_input(text: &str, llm: &LlmClient) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_INPUT_CHARS {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if JD_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return true;
    }

    let prompt = RELEVANCE_PROMPT_TEMPLATE.replace("{text}", trimmed);
    match llm.invoke(&prompt).await {
        Ok(reply) => reply.trim().to_lowercase().starts_with('y'),
        Err(e) => {
            debug!("relevance probe failed, treating input as irrelevant: {e}");
            false
        }
    }
}
