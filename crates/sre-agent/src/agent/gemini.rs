//! Google Gemini backend
//!
//! Talks to the Google AI Studio `generateContent` endpoint using API key
//! authentication (`?key=` query parameter).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::provider::{LLMProvider, ProviderError};
use crate::config::CloudConfig;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContentResponse,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

/// Cloud backend backed by the Gemini REST API.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn from_config(config: &CloudConfig) -> crate::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| crate::Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// URL without the key, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn extract_text(body: &str) -> Result<String, ProviderError> {
        let parsed: GeminiResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON from Gemini: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "expected candidates[0].content.parts[0].text in Gemini response".to_string(),
                )
            })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn check_ready(&self) -> Result<(), ProviderError> {
        match &self.api_key {
            Some(_) => Ok(()),
            None => Err(ProviderError::MissingApiKey { env_var: API_KEY_ENV }),
        }
    }

    async fn prompt(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey { env_var: API_KEY_ENV })?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        info!("Sending {} byte prompt to Gemini model {}", prompt.len(), self.model);
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Gemini request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to read Gemini response: {}", e.without_url())))?;
        debug!("Gemini responded with {}", status);

        match status {
            StatusCode::OK => Self::extract_text(&body),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Gemini rate limit hit");
                Err(ProviderError::RateLimited)
            }
            other => Err(ProviderError::Api {
                status: other.as_u16(),
                body,
            }),
        }
    }
}
