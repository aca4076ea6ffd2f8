//! Ollama backend
//!
//! Non-streaming `/api/generate` calls against an Ollama instance reachable
//! from inside the cluster.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::provider::{LLMProvider, ProviderError};
use crate::config::LocalConfig;

pub const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Local backend backed by an Ollama server.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn from_config(config: &LocalConfig) -> crate::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn prompt(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        info!("Sending prompt to local model {} at {}", self.model, self.endpoint());
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Local LLM request failed: {}", e);
                if e.is_timeout() {
                    ProviderError::Unavailable(format!(
                        "local LLM did not answer within {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    ProviderError::Unavailable(format!("could not reach local LLM: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to read local LLM response: {}", e)))?;
        debug!("Ollama responded with {}", status);

        if status != StatusCode::OK {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("expected a top-level 'response' field: {}", e))
        })?;
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as HttpStatus, routing::post, Router};

    /// Local stand-in for Ollama answering every generate call the same way.
    async fn spawn_ollama(delay: Duration, status: HttpStatus, body: &'static str) -> String {
        let app = Router::new().route(
            GENERATE_PATH,
            post(move || async move {
                tokio::time::sleep(delay).await;
                (status, body)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider(base_url: String, timeout_seconds: u64) -> OllamaProvider {
        OllamaProvider::from_config(&LocalConfig {
            base_url,
            model: "llama3".to_string(),
            timeout_seconds,
        })
        .unwrap()
    }

    #[test]
    fn request_body_disables_streaming() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "why?",
            stream: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "llama3", "prompt": "why?", "stream": false})
        );
    }

    #[test]
    fn endpoint_appends_generate_path() {
        let provider = OllamaProvider::from_config(&LocalConfig {
            base_url: "http://ollama-service:11434/".to_string(),
            model: "llama3".to_string(),
            timeout_seconds: 60,
        })
        .unwrap();
        assert_eq!(provider.endpoint(), "http://ollama-service:11434/api/generate");
        assert!(provider.check_ready().is_ok());
    }

    #[tokio::test]
    async fn slow_model_times_out_as_unavailable() {
        let url = spawn_ollama(Duration::from_secs(3), HttpStatus::OK, r#"{"response":"late"}"#).await;

        let err = provider(url, 1).prompt("hello").await.unwrap_err();
        match err {
            ProviderError::Unavailable(message) => assert!(message.contains("within 1s"), "{}", message),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_response_field_is_malformed() {
        let url = spawn_ollama(Duration::ZERO, HttpStatus::OK, r#"{"model":"llama3","done":true}"#).await;

        let err = provider(url, 5).prompt("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn connection_refused_becomes_unavailable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let provider = OllamaProvider::from_config(&LocalConfig {
            base_url: format!("http://127.0.0.1:{}", port),
            model: "llama3".to_string(),
            timeout_seconds: 2,
        })
        .unwrap();
        let err = provider.prompt("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
