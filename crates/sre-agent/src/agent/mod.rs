//! LLM Diagnosis Module
//!
//! Turns captured workload logs into a diagnosis using a cloud or local LLM
//! backend.

pub mod gemini;
pub mod ollama;
pub mod provider;
pub mod runtime;
pub mod templates;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use provider::{create_provider, BackendKind, LLMProvider, MockProvider, ProviderError};
pub use runtime::{diagnose, AgentRuntime, RunReport};
pub use templates::build_diagnosis_prompt;
