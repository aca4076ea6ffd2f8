//! LLM Provider Abstraction
//!
//! Provides a unified interface over the cloud and local inference backends.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::gemini::GeminiProvider;
use super::ollama::OllamaProvider;
use crate::config::Config;

/// Which backend turns prompts into diagnoses. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cloud,
    Local,
}

impl FromStr for BackendKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloud" | "gemini" => Ok(BackendKind::Cloud),
            "local" | "ollama" => Ok(BackendKind::Local),
            other => Err(crate::Error::Config(format!(
                "unknown LLM provider '{}', expected 'cloud' or 'local'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Cloud => f.write_str("cloud"),
            BackendKind::Local => f.write_str("local"),
        }
    }
}

/// Ways a backend can fail to produce a completion.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{env_var} is not set. Run: export {env_var}='your_key_here'")]
    MissingApiKey { env_var: &'static str },
    #[error("Rate limit reached (HTTP 429). Please wait 60 seconds before retrying.")]
    RateLimited,
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Trait for LLM providers that can handle prompts
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Check configuration without touching the network
    fn check_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Send a prompt to the LLM and get a response
    async fn prompt(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Mock provider for testing and dry runs
pub struct MockProvider {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn received_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(
            "1. HTTP 500 returned after \"CRITICAL: Database Connection Timeout\".\n\
             2. Verify with: kubectl get pods -l app=broken-app\n\
             3. Check database reachability and connection pool limits.",
        )
    }
}

#[async_trait::async_trait]
impl LLMProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn prompt(&self, prompt: &str) -> Result<String, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self.response.clone())
    }
}

/// Create a provider from configuration
pub fn create_provider(config: &Config) -> crate::Result<Arc<dyn LLMProvider>> {
    match config.provider {
        BackendKind::Cloud => Ok(Arc::new(GeminiProvider::from_config(&config.cloud)?)),
        BackendKind::Local => Ok(Arc::new(OllamaProvider::from_config(&config.local)?)),
    }
}
