//! Answer Evaluator — scores a candidate answer via the LLM, with a
//! marker-wrapped retry for unparseable output, a raw-text terminal shape,
//! a never-failing wrapper, and a deterministic quick evaluator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::interview::extract::extract_json;
use crate::interview::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_RETRY_TEMPLATE};
use crate::llm_client::{LlmClient, LlmError};

const JSON_START_MARKER: &str = "<JSON>";
const JSON_END_MARKER: &str = "</JSON>";
const ANSWER_ECHO_CHARS: usize = 200;
const RAW_SNIPPET_CHARS: usize = 400;

/// Structured feedback for one answer.
///
/// All five core fields are always present in the serialized form. When
/// structured parsing fails entirely, `raw_feedback` carries the model's
/// original text and everything else stays at its default; when parsing
/// succeeds, the original parsed object is retained under `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub rating: Option<i64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub raw: Option<Value>,
    pub raw_feedback: Option<String>,
}

impl FeedbackRecord {
    fn from_raw_text(text: String) -> Self {
        Self {
            rating: None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            suggestions: Vec::new(),
            raw: None,
            raw_feedback: Some(text),
        }
    }

    /// Snippet of the raw-feedback text for the session diagnostic log.
    pub fn raw_snippet(&self) -> Option<String> {
        self.raw_feedback
            .as_ref()
            .map(|raw| raw.chars().take(RAW_SNIPPET_CHARS).collect())
    }
}

/// Evaluates an answer against its question.
///
/// On an unparseable first reply, retries once asking the model to wrap
/// the object between explicit markers. If that also fails, the original
/// text is returned under `raw_feedback` — a legitimate terminal shape,
/// not an error. Fails only when an invocation itself fails after retries.
pub async fn evaluate_answer(
    question: &str,
    answer: &str,
    llm: &LlmClient,
) -> Result<FeedbackRecord, LlmError> {
    let prompt = EVALUATION_PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{answer}", answer);
    let text = llm.invoke(&prompt).await?;

    let mut parsed = extract_json(&text);
    if parsed.is_none() {
        let retry_prompt = EVALUATION_RETRY_TEMPLATE
            .replace("{question}", question)
            .replace("{answer}", answer);
        let retry_text = llm.invoke(&retry_prompt).await?;
        parsed = between_markers(&retry_text).and_then(extract_json);
    }

    match parsed {
        Some(value) => Ok(validate_feedback(value)),
        None => {
            warn!("evaluation output failed structured parsing; returning raw text");
            Ok(FeedbackRecord::from_raw_text(text))
        }
    }
}

/// Never-failing wrapper around `evaluate_answer`. Any invocation failure
/// becomes a fixed-shape record whose `raw_feedback` describes the failure
/// and echoes a bounded prefix of the answer.
pub async fn evaluate_answer_safe(question: &str, answer: &str, llm: &LlmClient) -> FeedbackRecord {
    match evaluate_answer(question, answer, llm).await {
        Ok(feedback) => feedback,
        Err(e) => {
            warn!("answer evaluation failed: {e}");
            let echo: String = answer.chars().take(ANSWER_ECHO_CHARS).collect();
            FeedbackRecord::from_raw_text(format!(
                "LLM failed or returned invalid JSON for answer: {echo}"
            ))
        }
    }
}

/// The single place where `FeedbackRecord` defaults are decided for parsed
/// model output.
pub fn validate_feedback(value: Value) -> FeedbackRecord {
    FeedbackRecord {
        rating: coerce_rating(value.get("rating")),
        strengths: coerce_list(value.get("strengths")),
        weaknesses: coerce_list(value.get("weaknesses")),
        suggestions: coerce_list(value.get("suggestions")),
        raw: Some(value),
        raw_feedback: None,
    }
}

fn coerce_rating(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerces a field into an ordered list of short strings: lists pass
/// through (elements stringified), strings split on newline/semicolon/comma,
/// other scalars become a single-element list, null becomes empty.
fn coerce_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(item_string).collect(),
        Some(Value::String(s)) => s
            .split(['\n', ';', ','])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect(),
        Some(other) => vec![item_string(other)],
    }
}

fn item_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn between_markers(text: &str) -> Option<&str> {
    let start = text.find(JSON_START_MARKER)? + JSON_START_MARKER.len();
    let end = text[start..].find(JSON_END_MARKER)? + start;
    Some(&text[start..end])
}

// ────────────────────────────────────────────────────────────────────────────
// Quick heuristic evaluator
// ────────────────────────────────────────────────────────────────────────────

const TOPIC_KEYWORDS: &[&str] = &[
    "design",
    "scale",
    "latency",
    "throughput",
    "test",
    "monitor",
    "debug",
    "optimiz",
    "performance",
    "deploy",
    "ci",
    "cd",
    "api",
    "database",
    "cache",
    "security",
    "team",
    "lead",
];

const STAR_CUES: &[&str] = &[
    "situation",
    "task",
    "action",
    "result",
    "impact",
    "resulted",
    "led to",
    "we",
];

const IMPACT_CUES: &[&str] = &["percent", "x times", "increase", "decrease"];
const EXAMPLE_CUES: &[&str] = &["example", "we", "i", "led", "implemented", "built"];

/// Deterministic non-LLM evaluator: scores length, keyword hits, and
/// STAR-structure cues into a 1-10 rating with templated feedback. Pure
/// function, no I/O; used when low latency matters more than LLM-quality
/// feedback.
pub fn evaluate_answer_quick(_question: &str, answer: &str) -> FeedbackRecord {
    let text = answer.trim();
    if text.is_empty() {
        return FeedbackRecord {
            rating: Some(1),
            strengths: Vec::new(),
            weaknesses: vec!["No answer provided".to_string()],
            suggestions: vec![
                "Provide a concise answer describing your approach or example.".to_string(),
            ],
            raw: None,
            raw_feedback: None,
        };
    }

    let lowered = text.to_lowercase();
    let hits: Vec<&str> = TOPIC_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lowered.contains(k))
        .collect();

    let mut strengths: Vec<String> = hits.iter().take(5).map(|h| format!("Mentions: {h}")).collect();
    let mut weaknesses = Vec::new();
    let mut suggestions = Vec::new();

    let word_count = text.split_whitespace().count();
    let length_score = if word_count > 40 {
        strengths.push("Answer has good detail".to_string());
        7
    } else if word_count > 15 {
        strengths.push("Answer is reasonably detailed".to_string());
        5
    } else {
        weaknesses.push("Answer is short; add an example or more specifics".to_string());
        3
    };

    if STAR_CUES.iter().any(|cue| lowered.contains(cue)) {
        strengths.push("Uses STAR-style structure or gives concrete impact".to_string());
    }

    let rating = ((hits.len() as f64 * 1.5) + f64::from(length_score)) as i64;
    let rating = rating.clamp(1, 10);

    if !text.contains('%') && !IMPACT_CUES.iter().any(|cue| lowered.contains(cue)) {
        suggestions.push("Include measurable impact (e.g., reduced latency by 30%).".to_string());
    }
    if !EXAMPLE_CUES.iter().any(|cue| lowered.contains(cue)) {
        suggestions.push("Add a concrete example with steps and outcome.".to_string());
    }

    FeedbackRecord {
        rating: Some(rating),
        strengths,
        weaknesses,
        suggestions,
        raw: None,
        raw_feedback: None,
    }
}
