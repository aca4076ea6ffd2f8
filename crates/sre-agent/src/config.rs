use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::agent::provider::BackendKind;

pub const DEFAULT_TARGET_APP: &str = "broken-app";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://ollama-service:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TAIL_LINES: usize = 50;
pub const DEFAULT_PREVIEW_CHARS: usize = 200;
pub const DEFAULT_DEMO_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_FAILURE_RATE: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: BackendKind,
    pub cloud: CloudConfig,
    pub local: LocalConfig,
    pub logs: LogSourceConfig,
    pub target_app: String,
    pub preview_chars: usize,
}

/// Settings for the hosted Gemini backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: Option<u64>,
}

// Keeps the key out of `info!("{:?}", config)`.
impl std::fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Settings for the in-cluster Ollama backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSourceConfig {
    pub kubectl_path: PathBuf,
    pub namespace: Option<String>,
    pub tail_lines: usize,
    pub timeout_seconds: Option<u64>,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER") {
            Some(value) => value.parse::<BackendKind>()?,
            None => BackendKind::default(),
        };

        let config = Config {
            provider,
            cloud: CloudConfig {
                api_key: lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty()),
                base_url: lookup("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                timeout_seconds: parse_optional(&lookup, "CLOUD_TIMEOUT_SECS")?,
            },
            local: LocalConfig {
                base_url: lookup("OLLAMA_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
                model: lookup("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                timeout_seconds: parse_optional(&lookup, "OLLAMA_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_OLLAMA_TIMEOUT_SECS),
            },
            logs: LogSourceConfig {
                kubectl_path: lookup("KUBECTL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("kubectl")),
                namespace: lookup("KUBE_NAMESPACE").filter(|ns| !ns.is_empty()),
                tail_lines: parse_optional(&lookup, "LOG_TAIL_LINES")?
                    .unwrap_or(DEFAULT_TAIL_LINES),
                timeout_seconds: parse_optional(&lookup, "LOG_FETCH_TIMEOUT_SECS")?,
            },
            target_app: lookup("TARGET_APP").unwrap_or_else(|| DEFAULT_TARGET_APP.to_string()),
            preview_chars: parse_optional(&lookup, "LOG_PREVIEW_CHARS")?
                .unwrap_or(DEFAULT_PREVIEW_CHARS),
        };

        config.validate()?;

        if config.provider == BackendKind::Cloud && config.cloud.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set. The cloud backend will refuse to run.");
        }

        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        url::Url::parse(&self.cloud.base_url)?;
        url::Url::parse(&self.local.base_url)?;

        if self.logs.tail_lines == 0 {
            return Err(crate::Error::Config(
                "LOG_TAIL_LINES must be greater than zero".to_string(),
            ));
        }
        if self.target_app.is_empty() {
            return Err(crate::Error::Config("TARGET_APP must not be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: BackendKind::default(),
            cloud: CloudConfig {
                api_key: None,
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                timeout_seconds: None,
            },
            local: LocalConfig {
                base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
                model: DEFAULT_OLLAMA_MODEL.to_string(),
                timeout_seconds: DEFAULT_OLLAMA_TIMEOUT_SECS,
            },
            logs: LogSourceConfig {
                kubectl_path: PathBuf::from("kubectl"),
                namespace: None,
                tail_lines: DEFAULT_TAIL_LINES,
                timeout_seconds: None,
            },
            target_app: DEFAULT_TARGET_APP.to_string(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Settings for the `broken-app` demo workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub addr: String,
    pub failure_rate: f64,
}

impl DemoConfig {
    pub fn load() -> crate::Result<Self> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = DemoConfig {
            addr: lookup("DEMO_ADDR").unwrap_or_else(|| DEFAULT_DEMO_ADDR.to_string()),
            failure_rate: parse_optional(&lookup, "DEMO_FAILURE_RATE")?
                .unwrap_or(DEFAULT_FAILURE_RATE),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(crate::Error::Config(format!(
                "failure rate must be between 0 and 1, got {}",
                self.failure_rate
            )));
        }
        Ok(())
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_DEMO_ADDR.to_string(),
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> crate::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| crate::Error::Config(format!("invalid value for {}: {} ({})", key, raw, e))),
        None => Ok(None),
    }
}
