//! Kubectl Log Source
//!
//! Shells out to `kubectl logs` for the pods matching an `app=<label>` selector.

use super::{tail_lines, LogSource, LogText};
use crate::config::LogSourceConfig;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

lazy_static! {
    // Kubernetes label value grammar.
    static ref LABEL_VALUE: Regex =
        Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("label regex is valid");
}

const MAX_LABEL_LEN: usize = 63;

/// Log source backed by the `kubectl` CLI.
#[derive(Debug, Clone)]
pub struct KubectlLogSource {
    program: PathBuf,
    namespace: Option<String>,
    tail: usize,
    timeout: Option<Duration>,
}

impl KubectlLogSource {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("kubectl"),
            namespace: None,
            tail: crate::config::DEFAULT_TAIL_LINES,
            timeout: None,
        }
    }

    pub fn from_config(config: &LogSourceConfig) -> Self {
        Self {
            program: config.kubectl_path.clone(),
            namespace: config.namespace.clone(),
            tail: config.tail_lines,
            timeout: config.timeout_seconds.map(Duration::from_secs),
        }
    }

    /// Use a different binary in place of `kubectl`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Arguments passed to the binary. The label is always its own argument.
    pub fn build_args(&self, label: &str) -> Vec<String> {
        let mut args = vec![
            "logs".to_string(),
            "-l".to_string(),
            format!("app={}", label),
            format!("--tail={}", self.tail),
        ];
        if let Some(ns) = &self.namespace {
            args.push("-n".to_string());
            args.push(ns.clone());
        }
        args
    }

    fn validate_label(label: &str) -> Result<(), String> {
        if label.len() > MAX_LABEL_LEN {
            return Err(format!(
                "workload label '{}' is longer than {} characters",
                label, MAX_LABEL_LEN
            ));
        }
        if !LABEL_VALUE.is_match(label) {
            return Err(format!("workload label '{}' is not a valid label value", label));
        }
        Ok(())
    }

    async fn run(&self, label: &str) -> LogText {
        let args = self.build_args(label);
        debug!("Running {} {}", self.program.display(), args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(&args).kill_on_drop(true);
        let output = command.output();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Log fetch for '{}' timed out after {:?}", label, limit);
                    return LogText::fetch_error(format!("timed out after {:?}", limit));
                }
            },
            None => output.await,
        };

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let logs = tail_lines(&stdout, self.tail);
                info!("Captured {} log lines for '{}'", logs.lines().count(), label);
                LogText::captured(logs)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                warn!("{} exited with {}", self.program.display(), output.status);
                if stderr.is_empty() {
                    LogText::fetch_error(format!("command exited with {}", output.status))
                } else {
                    LogText::fetch_error(format!("command exited with {}: {}", output.status, stderr))
                }
            }
            Err(e) => {
                warn!("Failed to spawn {}: {}", self.program.display(), e);
                LogText::fetch_error(format!("failed to run {}: {}", self.program.display(), e))
            }
        }
    }
}

impl Default for KubectlLogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSource for KubectlLogSource {
    async fn fetch(&self, label: &str) -> LogText {
        if let Err(reason) = Self::validate_label(label) {
            warn!("Refusing to fetch logs: {}", reason);
            return LogText::fetch_error(reason);
        }
        self.run(label).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::FETCH_ERROR_MARKER;

    #[test]
    fn args_keep_label_as_single_argument() {
        let source = KubectlLogSource::new().with_namespace("staging");
        assert_eq!(
            source.build_args("broken-app"),
            vec!["logs", "-l", "app=broken-app", "--tail=50", "-n", "staging"]
        );
    }

    #[test]
    fn label_validation() {
        assert!(KubectlLogSource::validate_label("broken-app").is_ok());
        assert!(KubectlLogSource::validate_label("api.v2_worker").is_ok());
        assert!(KubectlLogSource::validate_label("app; rm -rf /").is_err());
        assert!(KubectlLogSource::validate_label("$(whoami)").is_err());
        assert!(KubectlLogSource::validate_label("-leading").is_err());
        assert!(KubectlLogSource::validate_label("").is_err());
        assert!(KubectlLogSource::validate_label(&"a".repeat(64)).is_err());
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        // `echo` stands in for kubectl and prints the arguments it receives.
        let source = KubectlLogSource::new().with_program("echo");
        let logs = source.fetch("broken-app").await;
        assert!(!logs.fetch_failed());
        assert_eq!(logs.as_str().trim(), "logs -l app=broken-app --tail=50");
    }

    #[tokio::test]
    async fn non_zero_exit_becomes_marked_text() {
        let source = KubectlLogSource::new().with_program("false");
        let logs = source.fetch("broken-app").await;
        assert!(logs.fetch_failed());
        assert!(logs.as_str().starts_with(FETCH_ERROR_MARKER));
    }

    #[tokio::test]
    async fn missing_binary_becomes_marked_text() {
        let source = KubectlLogSource::new().with_program("/nonexistent/kubectl-for-tests");
        let logs = source.fetch("broken-app").await;
        assert!(logs.fetch_failed());
        assert!(logs.as_str().contains("failed to run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_is_cut_off_at_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let script = std::env::temp_dir().join(format!("slow-kubectl-{}", std::process::id()));
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = KubectlLogSource::new()
            .with_program(&script)
            .with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let logs = source.fetch("broken-app").await;
        let _ = std::fs::remove_file(&script);

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(logs.fetch_failed());
        assert_eq!(logs.as_str(), "Error fetching logs: timed out after 300ms");
    }

    #[test]
    fn timeout_comes_from_config() {
        let source = KubectlLogSource::from_config(&LogSourceConfig {
            kubectl_path: PathBuf::from("kubectl"),
            namespace: None,
            tail_lines: 20,
            timeout_seconds: Some(15),
        });
        assert_eq!(source.timeout, Some(Duration::from_secs(15)));
        assert_eq!(source.build_args("broken-app")[3], "--tail=20");
    }

    #[tokio::test]
    async fn invalid_label_never_reaches_the_command() {
        let source = KubectlLogSource::new().with_program("/nonexistent/kubectl-for-tests");
        let logs = source.fetch("x && reboot").await;
        assert!(logs.fetch_failed());
        assert!(logs.as_str().contains("not a valid label value"));
    }
}
