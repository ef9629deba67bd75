//! Per-session state for one candidate's ongoing interview.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::interview::feedback::FeedbackRecord;
use crate::interview::question::QuestionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Idle,
    Pending,
    Ready,
    Error,
}

/// Evaluation sub-state. Transitions only idle → pending → {ready|error};
/// a new answer submission from ready/error resets it to pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationState {
    pub status: EvaluationStatus,
    pub last_feedback: Option<FeedbackRecord>,
    pub next_question: Option<String>,
    pub error: Option<String>,
}

impl Default for EvaluationState {
    fn default() -> Self {
        Self {
            status: EvaluationStatus::Idle,
            last_feedback: None,
            next_question: None,
            error: None,
        }
    }
}

/// One answered question: the triple appended to session history after
/// each evaluation. History only grows; entries are never removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerExchange {
    pub question: String,
    pub answer: String,
    pub feedback: FeedbackRecord,
}

/// One candidate's interview. Mutated only by background units belonging
/// to this session id; read concurrently through `snapshot`.
#[derive(Debug)]
pub struct InterviewSession {
    pub id: Uuid,
    pub job_description: String,
    pub parsed: Option<QuestionRecord>,
    pub questions: Vec<String>,
    pub answers: Vec<AnswerExchange>,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub evaluation: EvaluationState,
    pub log: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(id: Uuid, job_description: String) -> Self {
        Self {
            id,
            job_description,
            parsed: None,
            questions: Vec::new(),
            answers: Vec::new(),
            status: SessionStatus::Pending,
            error: None,
            evaluation: EvaluationState::default(),
            log: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Appends an entry to the diagnostic log. Append-only.
    pub fn push_log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    /// The question currently visible to a caller: the most recently
    /// generated one, or none before the first question lands.
    pub fn current_question(&self) -> Option<&str> {
        self.questions.last().map(String::as_str)
    }

    /// Consistent point-in-time view for status reads.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            session_id: self.id,
            status: self.status,
            question: self.current_question().map(String::from),
            parsed: self.parsed.clone(),
            error: self.error.clone(),
            evaluation: self.evaluation.clone(),
            log: self.log.clone(),
            created_at: self.created_at,
        }
    }
}

/// Status payload returned to pollers. Always a valid snapshot, possibly
/// stale, never a half-written structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub question: Option<String>,
    /// Parsed view of the job description once the first question exists.
    pub parsed: Option<QuestionRecord>,
    pub error: Option<String>,
    pub evaluation: EvaluationState,
    pub log: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_pending_and_idle() {
        let session = InterviewSession::new(Uuid::new_v4(), "Backend engineer".to_string());
        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.evaluation.status, EvaluationStatus::Idle);
        assert!(session.questions.is_empty());
        assert!(session.current_question().is_none());
    }

    #[test]
    fn current_question_is_the_last_one() {
        let mut session = InterviewSession::new(Uuid::new_v4(), "jd".to_string());
        session.questions.push("first".to_string());
        session.questions.push("second".to_string());
        assert_eq!(session.current_question(), Some("second"));
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(SessionStatus::Pending).unwrap(),
            serde_json::json!("pending")
        );
        assert_eq!(
            serde_json::to_value(EvaluationStatus::Ready).unwrap(),
            serde_json::json!("ready")
        );
    }
}
