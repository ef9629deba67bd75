//! Axum route handlers for the Interview API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::relevance::check_relevant_input;
use crate::session::model::StatusSnapshot;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub session_id: Uuid,
    /// Always empty here: the first question arrives via the status
    /// endpoint once the background unit finishes.
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    pub answer: String,
    /// Use the deterministic heuristic evaluator instead of the LLM.
    #[serde(default)]
    pub quick: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub message: &'static str,
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RelevanceRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RelevanceResponse {
    pub relevant: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Creates a session and schedules first-question generation. Poll the
/// status endpoint for the question.
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> Result<Json<StartInterviewResponse>, AppError> {
    let session_id = state.orchestrator.start_interview(&request.job_description)?;
    Ok(Json(StartInterviewResponse {
        session_id,
        question: String::new(),
    }))
}

/// POST /api/v1/interviews/:id/answer
///
/// Schedules evaluation of the answer; the result lands in the status
/// payload's evaluation sub-state.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    state
        .orchestrator
        .submit_answer(session_id, request.question, request.answer, request.quick)?;
    Ok(Json(AnswerResponse {
        message: "evaluation_scheduled",
        session_id,
    }))
}

/// GET /api/v1/interviews/:id/status
///
/// Eventually-consistent snapshot of the session: status, current
/// question, evaluation sub-state, and the diagnostic log.
pub async fn handle_get_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StatusSnapshot>, AppError> {
    Ok(Json(state.orchestrator.get_status(session_id)?))
}

/// POST /api/v1/interviews/relevance
///
/// Pre-check whether free text looks like a job description.
pub async fn handle_check_relevance(
    State(state): State<AppState>,
    Json(request): Json<RelevanceRequest>,
) -> Json<RelevanceResponse> {
    let relevant = check_relevant_input(&request.text, &state.llm).await;
    Json(RelevanceResponse { relevant })
}
