//! LLM Client — the single point of entry for all model calls in the service.
//!
//! ARCHITECTURAL RULE: No other module may talk to the completion endpoint
//! directly. All LLM interactions MUST go through `LlmClient::invoke`.
//!
//! The remote capability is abstracted behind `CompletionBackend` so the
//! invoker's timeout/retry behavior can be exercised against scripted
//! backends in tests. Production uses `HttpCompletionBackend`, which speaks
//! the OpenAI-compatible chat-completions protocol.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.7;

/// Terminal invocation failures, produced only after the retry budget is
/// exhausted. Partial or garbled text is never returned.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM call timed out after {timeout:?} (attempts={attempts})")]
    Timeout { timeout: Duration, attempts: u32 },

    #[error("LLM invocation failed after {attempts} attempts: {source}")]
    Invocation {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}

/// Abstract text-completion capability: one prompt in, one text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Per-call invocation limits. Defaults come from `Config`; individual calls
/// may override via `invoke_with`.
#[derive(Debug, Clone, Copy)]
pub struct InvokeOptions {
    /// Bounds how long the caller waits, not the worker's own execution.
    pub timeout: Duration,
    /// Additional attempts after the first failure.
    pub retries: u32,
    /// Exponential backoff base; sleep is `backoff^(attempt-1)` seconds.
    pub backoff: f64,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retries: 2,
            backoff: 2.0,
        }
    }
}

/// The single LLM client used by every service in the crate. Wraps a
/// completion backend with a hard wait-timeout and bounded retry/backoff.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn CompletionBackend>,
    options: InvokeOptions,
}

enum AttemptFailure {
    TimedOut,
    Transport(anyhow::Error),
}

impl LlmClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, options: InvokeOptions) -> Self {
        Self { backend, options }
    }

    /// Invokes the backend with the configured default options.
    pub async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        self.invoke_with(prompt, self.options).await
    }

    /// Invokes the backend with explicit options.
    ///
    /// Each attempt runs on its own spawned task; the caller awaits the
    /// handle under a timeout. A timed-out worker is dropped detached — it
    /// may keep running, but its result is discarded and cannot be observed
    /// by this or any later call.
    pub async fn invoke_with(
        &self,
        prompt: &str,
        options: InvokeOptions,
    ) -> Result<String, LlmError> {
        let attempts = 1 + options.retries;
        let mut last_failure = AttemptFailure::TimedOut;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = Duration::from_secs_f64(options.backoff.powi(attempt as i32 - 2));
                warn!(
                    "LLM attempt {}/{} failed, retrying after {:?}",
                    attempt - 1,
                    attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            let backend = Arc::clone(&self.backend);
            let prompt = prompt.to_string();
            let worker = tokio::spawn(async move { backend.complete(&prompt).await });

            match tokio::time::timeout(options.timeout, worker).await {
                Ok(Ok(Ok(text))) => {
                    debug!(
                        "LLM call succeeded on attempt {attempt} ({} chars)",
                        text.len()
                    );
                    return Ok(text);
                }
                Ok(Ok(Err(e))) => {
                    last_failure = AttemptFailure::Transport(e);
                }
                Ok(Err(join_err)) => {
                    last_failure = AttemptFailure::Transport(anyhow::anyhow!(
                        "completion worker panicked: {join_err}"
                    ));
                }
                Err(_elapsed) => {
                    // Dropping the handle abandons the worker without
                    // aborting it; best-effort cancellation only.
                    last_failure = AttemptFailure::TimedOut;
                }
            }
        }

        match last_failure {
            AttemptFailure::TimedOut => Err(LlmError::Timeout {
                timeout: options.timeout,
                attempts,
            }),
            AttemptFailure::Transport(source) => Err(LlmError::Invocation { attempts, source }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP backend (OpenAI-compatible chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Production backend posting to an OpenAI-compatible `/chat/completions`
/// endpoint. Deadlines are owned by `LlmClient`, not the HTTP client.
pub struct HttpCompletionBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpCompletionBackend {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("completion endpoint returned {status}: {body}");
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM returned empty content"))?;

        Ok(content.trim().to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test support
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone)]
    pub enum Reply {
        Text(String),
        Error(String),
        /// Never completes within any realistic timeout.
        Hang,
    }

    impl Reply {
        pub fn text(s: &str) -> Self {
            Reply::Text(s.to_string())
        }

        pub fn error(s: &str) -> Self {
            Reply::Error(s.to_string())
        }
    }

    /// Backend that replays a scripted sequence of outcomes, then repeats
    /// `fallback` (if any) once the script is exhausted.
    pub struct ScriptedBackend {
        script: Mutex<VecDeque<Reply>>,
        fallback: Option<Reply>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        pub fn new(script: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback: None,
                calls: AtomicU32::new(0),
            })
        }

        pub fn repeating(fallback: Reply) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(VecDeque::new()),
                fallback: Some(fallback),
                calls: AtomicU32::new(0),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.fallback.clone());
            match reply {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Error(message)) => Err(anyhow::anyhow!(message)),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(86_400)).await;
                    Err(anyhow::anyhow!("hung backend woke up"))
                }
                None => Err(anyhow::anyhow!("scripted backend exhausted")),
            }
        }
    }

    pub fn client_with(backend: Arc<ScriptedBackend>, options: InvokeOptions) -> LlmClient {
        LlmClient::new(backend, options)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{client_with, Reply, ScriptedBackend};
    use super::*;

    fn options(timeout_secs: u64, retries: u32, backoff: f64) -> InvokeOptions {
        InvokeOptions {
            timeout: Duration::from_secs(timeout_secs),
            retries,
            backoff,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_attempt_without_sleeping() {
        let backend = ScriptedBackend::new(vec![Reply::text("hello")]);
        let llm = client_with(backend.clone(), options(30, 2, 2.0));

        let started = tokio::time::Instant::now();
        let text = llm.invoke("prompt").await.unwrap();

        assert_eq!(text, "hello");
        assert_eq!(backend.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exponential_backoff_then_succeeds() {
        let backend = ScriptedBackend::new(vec![
            Reply::error("boom"),
            Reply::error("boom"),
            Reply::text("recovered"),
        ]);
        let llm = client_with(backend.clone(), options(30, 3, 2.0));

        let started = tokio::time::Instant::now();
        let text = llm.invoke("prompt").await.unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(backend.calls(), 3);
        // Two failures => slept 2^0 + 2^1 seconds.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_and_reports_timeout() {
        let backend = ScriptedBackend::repeating(Reply::Hang);
        let llm = client_with(backend.clone(), options(1, 2, 2.0));

        let err = llm.invoke("prompt").await.unwrap_err();

        assert_eq!(backend.calls(), 3);
        assert!(matches!(err, LlmError::Timeout { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_and_reports_last_transport_error() {
        let backend = ScriptedBackend::repeating(Reply::error("connection refused"));
        let llm = client_with(backend.clone(), options(5, 1, 2.0));

        let err = llm.invoke("prompt").await.unwrap_err();

        assert_eq!(backend.calls(), 2);
        match err {
            LlmError::Invocation { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("expected Invocation, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn error_kind_follows_the_last_failure() {
        // Timeout first, transport error second: terminal error is Invocation.
        let backend = ScriptedBackend::new(vec![Reply::Hang, Reply::error("bad gateway")]);
        let llm = client_with(backend, options(1, 1, 2.0));
        let err = llm.invoke("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Invocation { .. }));

        // Transport error first, timeout second: terminal error is Timeout.
        let backend = ScriptedBackend::new(vec![Reply::error("bad gateway"), Reply::Hang]);
        let llm = client_with(backend, options(1, 1, 2.0));
        let err = llm.invoke("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_worker_does_not_corrupt_the_next_attempt() {
        let backend = ScriptedBackend::new(vec![Reply::Hang, Reply::text("clean result")]);
        let llm = client_with(backend.clone(), options(1, 1, 2.0));

        let text = llm.invoke("prompt").await.unwrap();

        assert_eq!(text, "clean result");
        assert_eq!(backend.calls(), 2);
    }
}
