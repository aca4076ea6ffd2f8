//! Agent Runtime
//!
//! Runs the diagnosis pipeline once: fetch logs, build the prompt, ask the
//! backend, print the result.

use super::{
    provider::{LLMProvider, ProviderError},
    templates,
};
use crate::config::DEFAULT_PREVIEW_CHARS;
use crate::logs::{LogSource, LogText};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Turn a prompt into displayable text. Backend failures are rendered as
/// text instead of being returned.
pub async fn diagnose(provider: &dyn LLMProvider, prompt: &str) -> String {
    match provider.prompt(prompt).await {
        Ok(text) => text,
        Err(e) => {
            error!("{} backend failed: {}", provider.name(), e);
            render_provider_error(&e)
        }
    }
}

fn render_provider_error(err: &ProviderError) -> String {
    match err {
        ProviderError::RateLimited => format!("⚠️ {}", err),
        _ => format!("❌ {}", err),
    }
}

/// Outcome of a single pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub app: String,
    pub started_at: DateTime<Utc>,
    pub errors_detected: bool,
    pub logs: LogText,
    pub diagnosis: String,
}

/// Agent runtime wiring a log source to a backend
pub struct AgentRuntime {
    log_source: Arc<dyn LogSource>,
    provider: Arc<dyn LLMProvider>,
    app: String,
    preview_chars: usize,
}

impl AgentRuntime {
    pub fn new(
        log_source: Arc<dyn LogSource>,
        provider: Arc<dyn LLMProvider>,
        app: impl Into<String>,
    ) -> Self {
        Self {
            log_source,
            provider,
            app: app.into(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Set how many characters of the captured logs are echoed
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Run the pipeline once, writing progress and the diagnosis to `out`.
    ///
    /// Returns [`Error::Config`] before any step runs when the backend is not
    /// usable. Every later failure is reported as text in `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<RunReport> {
        if let Err(e) = self.provider.check_ready() {
            error!("{} backend is not configured: {}", self.provider.name(), e);
            return Err(Error::Config(e.to_string()));
        }

        let started_at = Utc::now();
        info!("Starting diagnosis of '{}' with {} backend", self.app, self.provider.name());

        writeln!(out, "--- 🤖 AI SRE AGENT INITIALIZED ---")?;
        writeln!(out, "Monitoring cluster for '{}'...", self.app)?;

        let logs = self.log_source.fetch(&self.app).await;
        if logs.fetch_failed() {
            warn!("Log fetch failed for '{}'", self.app);
        }

        let errors_detected = logs.has_error_markers();
        if !errors_detected {
            // The diagnosis still runs so the operator sees the backend's view.
            writeln!(out, "✅ No errors detected in recent logs.")?;
        }

        writeln!(out)?;
        writeln!(out, "📄 Captured Logs:")?;
        let preview = logs.preview(self.preview_chars);
        if preview.len() < logs.as_str().len() {
            writeln!(out, "{}...", preview)?;
        } else {
            writeln!(out, "{}", preview)?;
        }
        writeln!(out)?;

        let prompt = templates::build_diagnosis_prompt(logs.as_str());

        writeln!(out, "🚀 Sending logs to AI Agent...")?;
        out.flush()?;
        let diagnosis = diagnose(self.provider.as_ref(), &prompt).await;

        writeln!(out)?;
        writeln!(out, "--- 🧠 AI DIAGNOSIS ---")?;
        writeln!(out, "{}", diagnosis)?;
        writeln!(out, "-----------------------")?;
        out.flush()?;

        info!("Diagnosis of '{}' complete", self.app);

        Ok(RunReport {
            app: self.app.clone(),
            started_at,
            errors_detected,
            logs,
            diagnosis,
        })
    }
}
