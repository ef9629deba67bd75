use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::InvokeOptions;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or limits are invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model: String,
    pub invoke_timeout_secs: u64,
    pub invoke_retries: u32,
    pub backoff_factor: f64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            llm_api_base_url: env_or("LLM_API_BASE_URL", "https://api.openai.com/v1"),
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini"),
            invoke_timeout_secs: parse_env("LLM_INVOKE_TIMEOUT", 120)?,
            invoke_retries: parse_env("LLM_INVOKE_RETRIES", 2)?,
            backoff_factor: parse_env("LLM_BACKOFF_FACTOR", 2.0)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        };

        anyhow::ensure!(
            config.invoke_timeout_secs > 0,
            "LLM_INVOKE_TIMEOUT must be greater than zero"
        );
        anyhow::ensure!(
            config.backoff_factor >= 1.0,
            "LLM_BACKOFF_FACTOR must be at least 1.0"
        );

        Ok(config)
    }

    /// Default invocation limits derived from the environment.
    pub fn invoke_options(&self) -> InvokeOptions {
        InvokeOptions {
            timeout: Duration::from_secs(self.invoke_timeout_secs),
            retries: self.invoke_retries,
            backoff: self.backoff_factor,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
