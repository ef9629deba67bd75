use crate::llm_client::LlmClient;
use crate::session::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Used directly only by the relevance pre-check; everything else goes
    /// through the orchestrator.
    pub llm: LlmClient,
}
