//! Session Orchestrator — drives the interview lifecycle.
//!
//! The caller-facing operations (`start_interview`, `submit_answer`,
//! `get_status`) return immediately; all LLM work runs in detached tokio
//! tasks whose only observable effect is mutating their own session
//! through the store. No error or panic escapes a background unit: every
//! failure lands in the session as an `error` status plus a log entry.

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::feedback::{evaluate_answer_quick, evaluate_answer_safe, FeedbackRecord};
use crate::interview::question::generate_question;
use crate::llm_client::LlmClient;
use crate::session::model::{
    AnswerExchange, EvaluationStatus, InterviewSession, SessionStatus, StatusSnapshot,
};
use crate::session::store::SessionStore;

#[derive(Clone)]
pub struct Orchestrator {
    store: SessionStore,
    llm: LlmClient,
}

impl Orchestrator {
    pub fn new(store: SessionStore, llm: LlmClient) -> Self {
        Self { store, llm }
    }

    /// Creates a session and schedules first-question generation. Returns
    /// the session id without waiting for the question; pollers observe
    /// `pending` until the background unit finishes.
    pub fn start_interview(&self, job_description: &str) -> Result<Uuid, AppError> {
        if job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "Please provide a job description or topic for a mock interview.".to_string(),
            ));
        }

        let id = self
            .store
            .insert(InterviewSession::new(Uuid::new_v4(), job_description.to_string()));

        let this = self.clone();
        tokio::spawn(async move { this.generate_first_question(id).await });

        info!("interview {id} started");
        Ok(id)
    }

    /// Marks evaluation pending and schedules evaluate-and-advance.
    /// `quick` selects the deterministic heuristic evaluator instead of
    /// the LLM for the feedback step.
    pub fn submit_answer(
        &self,
        id: Uuid,
        question: String,
        answer: String,
        quick: bool,
    ) -> Result<(), AppError> {
        self.store
            .update(id, |session| {
                session.evaluation.status = EvaluationStatus::Pending;
                session.evaluation.error = None;
            })
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

        let this = self.clone();
        tokio::spawn(async move { this.evaluate_and_advance(id, question, answer, quick).await });

        info!("interview {id}: evaluation scheduled (quick={quick})");
        Ok(())
    }

    /// Pure read: whatever the background units have written at call time.
    pub fn get_status(&self, id: Uuid) -> Result<StatusSnapshot, AppError> {
        self.store
            .read(id, InterviewSession::snapshot)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    // ── background units ────────────────────────────────────────────────

    async fn generate_first_question(&self, id: Uuid) {
        let Some(job_description) = self.store.update(id, |session| {
            session.push_log("generate_first_question: start");
            session.job_description.clone()
        }) else {
            return;
        };

        match generate_question(&job_description, &self.llm).await {
            Ok(record) => {
                let chars = record.question.chars().count();
                self.store.update(id, |session| {
                    session.questions.push(record.question.clone());
                    session.parsed = Some(record);
                    session.status = SessionStatus::Ready;
                    session.push_log(format!(
                        "generate_first_question: question ready ({chars} chars)"
                    ));
                });
            }
            Err(e) => {
                warn!("interview {id}: first-question generation failed: {e}");
                self.store.update(id, |session| {
                    session.status = SessionStatus::Error;
                    session.error = Some(e.to_string());
                    session.push_log(format!("generate_first_question: failed: {e}"));
                });
            }
        }
    }

    async fn evaluate_and_advance(&self, id: Uuid, question: String, answer: String, quick: bool) {
        if self
            .store
            .update(id, |session| session.push_log("evaluate_and_advance: start"))
            .is_none()
        {
            return;
        }

        let feedback: FeedbackRecord = if quick {
            evaluate_answer_quick(&question, &answer)
        } else {
            evaluate_answer_safe(&question, &answer, &self.llm).await
        };

        // History is appended before next-question generation so a failure
        // there can never lose an accepted answer.
        let raw_snippet = feedback.raw_snippet();
        let Some(job_description) = self.store.update(id, |session| {
            session.push_log("evaluate_and_advance: evaluator returned");
            if let Some(snippet) = raw_snippet {
                session.push_log(format!("raw_feedback_snippet: {snippet}"));
            }
            session.answers.push(AnswerExchange {
                question: question.clone(),
                answer: answer.clone(),
                feedback: feedback.clone(),
            });
            session.job_description.clone()
        }) else {
            return;
        };

        let next_question = match generate_question(&job_description, &self.llm).await {
            Ok(record) => Some(record.question),
            Err(e) => {
                warn!("interview {id}: next-question generation failed: {e}");
                None
            }
        };

        self.store.update(id, |session| {
            if let Some(q) = &next_question {
                session.questions.push(q.clone());
            }
            session.evaluation.status = EvaluationStatus::Ready;
            session.evaluation.last_feedback = Some(feedback);
            session.evaluation.next_question = next_question;
            session.push_log(format!(
                "evaluate_and_advance: finished, evaluation ready ({} answered)",
                session.answers.len()
            ));
        });
    }
}
