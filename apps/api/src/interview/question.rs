//! Question Generator — turns a job description into the next interview
//! question via the LLM, with a deterministic fallback when the model's
//! output cannot be parsed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::interview::extract::extract_json;
use crate::interview::prompts::QUESTION_PROMPT_TEMPLATE;
use crate::llm_client::{LlmClient, LlmError};

const UNSPECIFIED: &str = "unspecified";
const ROLE_PREVIEW_CHARS: usize = 60;

/// Parsed view of a job description plus the generated question.
///
/// `question` is always non-empty; the descriptive fields fall back to
/// `"unspecified"` (or empty for `skills`) when the model omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub role: String,
    pub seniority: String,
    pub skills: String,
    pub job_type: String,
    pub location: String,
    pub question: String,
}

/// Generates one interview question from a job description.
///
/// Fails only when the invocation itself fails after retries; an
/// unparseable model reply is absorbed by the fallback record.
pub async fn generate_question(
    job_description: &str,
    llm: &LlmClient,
) -> Result<QuestionRecord, LlmError> {
    let prompt = QUESTION_PROMPT_TEMPLATE.replace("{job_description}", job_description);
    let text = llm.invoke(&prompt).await?;

    let record = match extract_json(&text) {
        Some(value) => validate_question(&value, job_description),
        None => {
            warn!("question output was not parseable; using fallback record");
            fallback_record(job_description)
        }
    };
    Ok(record)
}

/// The single place where `QuestionRecord` defaults are decided.
///
/// Every field is coerced to a string; a missing or empty `question`
/// falls back to the templated question so the invariant "question is
/// non-empty" holds unconditionally.
fn validate_question(value: &Value, job_description: &str) -> QuestionRecord {
    let question = coerce_string(value.get("question"))
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| fallback_question(job_description));

    QuestionRecord {
        role: field_or(value, "role", UNSPECIFIED),
        seniority: field_or(value, "seniority", UNSPECIFIED),
        skills: field_or(value, "skills", ""),
        job_type: field_or(value, "job_type", UNSPECIFIED),
        location: field_or(value, "location", UNSPECIFIED),
        question,
    }
}

fn field_or(value: &Value, key: &str, default: &str) -> String {
    coerce_string(value.get(key))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(scalar_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(scalar_string(other)),
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Deterministic record used when extraction yields nothing: the role is
/// previewed from the first line of the job description and the question
/// is templated from its first word.
fn fallback_record(job_description: &str) -> QuestionRecord {
    let role: String = job_description
        .lines()
        .next()
        .unwrap_or("")
        .chars()
        .take(ROLE_PREVIEW_CHARS)
        .collect();

    QuestionRecord {
        role,
        seniority: UNSPECIFIED.to_string(),
        skills: String::new(),
        job_type: UNSPECIFIED.to_string(),
        location: UNSPECIFIED.to_string(),
        question: fallback_question(job_description),
    }
}

fn fallback_question(job_description: &str) -> String {
    let topic = job_description
        .split_whitespace()
        .next()
        .unwrap_or("this role");
    format!("Based on the job description, can you tell me about your experience related to {topic}?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{client_with, Reply, ScriptedBackend};
    use crate::llm_client::InvokeOptions;
    use serde_json::json;
    use std::time::Duration;

    const JD: &str = "Senior backend engineer, Python, distributed systems";

    fn quick_options() -> InvokeOptions {
        InvokeOptions {
            timeout: Duration::from_secs(5),
            retries: 0,
            backoff: 1.0,
        }
    }

    #[test]
    fn validate_keeps_all_model_fields() {
        let value = json!({
            "role": "Backend Engineer",
            "seniority": "senior",
            "skills": "Python, Kafka",
            "job_type": "full-time",
            "location": "remote",
            "question": "How do you shard a hot table?"
        });
        let record = validate_question(&value, JD);
        assert_eq!(record.role, "Backend Engineer");
        assert_eq!(record.seniority, "senior");
        assert_eq!(record.skills, "Python, Kafka");
        assert_eq!(record.question, "How do you shard a hot table?");
    }

    #[test]
    fn validate_defaults_missing_fields() {
        let value = json!({"question": "Why Rust?"});
        let record = validate_question(&value, JD);
        assert_eq!(record.role, "unspecified");
        assert_eq!(record.seniority, "unspecified");
        assert_eq!(record.skills, "");
        assert_eq!(record.job_type, "unspecified");
        assert_eq!(record.location, "unspecified");
        assert_eq!(record.question, "Why Rust?");
    }

    #[test]
    fn validate_coerces_non_string_fields() {
        let value = json!({
            "skills": ["Python", "Kafka"],
            "seniority": 5,
            "question": 42
        });
        let record = validate_question(&value, JD);
        assert_eq!(record.skills, "Python, Kafka");
        assert_eq!(record.seniority, "5");
        assert_eq!(record.question, "42");
    }

    #[test]
    fn validate_substitutes_templated_question_when_empty() {
        let value = json!({"role": "Engineer", "question": ""});
        let record = validate_question(&value, JD);
        assert_eq!(
            record.question,
            "Based on the job description, can you tell me about your experience related to Senior?"
        );
    }

    #[test]
    fn fallback_previews_first_line_to_sixty_chars() {
        let long_line = "X".repeat(80);
        let jd = format!("{long_line}\nsecond line");
        let record = fallback_record(&jd);
        assert_eq!(record.role.chars().count(), 60);
        assert_eq!(record.seniority, "unspecified");
        assert_eq!(record.skills, "");
        assert!(!record.question.is_empty());
    }

    #[tokio::test]
    async fn generates_record_from_well_formed_output() {
        let reply = json!({
            "role": "Backend Engineer",
            "seniority": "senior",
            "skills": "Python",
            "job_type": "full-time",
            "location": "remote",
            "question": "Describe a distributed system you designed."
        });
        let backend = ScriptedBackend::new(vec![Reply::Text(reply.to_string())]);
        let llm = client_with(backend, quick_options());

        let record = generate_question(JD, &llm).await.unwrap();
        assert_eq!(record.question, "Describe a distributed system you designed.");
        assert_eq!(record.role, "Backend Engineer");
    }

    #[tokio::test]
    async fn unparseable_output_yields_fallback_record() {
        let backend = ScriptedBackend::new(vec![Reply::text("I cannot answer in JSON, sorry.")]);
        let llm = client_with(backend, quick_options());

        let record = generate_question(JD, &llm).await.unwrap();
        assert_eq!(record.role, JD);
        assert!(record.question.contains("Senior"));
    }

    #[tokio::test]
    async fn invocation_failure_propagates() {
        let backend = ScriptedBackend::repeating(Reply::error("boom"));
        let llm = client_with(backend, quick_options());

        let err = generate_question(JD, &llm).await.unwrap_err();
        assert!(matches!(err, LlmError::Invocation { .. }));
    }
}
