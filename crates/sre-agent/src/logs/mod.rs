//! Log Source Module
//!
//! Retrieves recent log output for a workload so it can be handed to a backend.

pub mod kubectl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use kubectl::KubectlLogSource;

/// Prefix carried by every log text produced from a failed fetch.
pub const FETCH_ERROR_MARKER: &str = "Error fetching logs:";

/// Captured log output, or a description of why it could not be captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogText {
    text: String,
    fetch_failed: bool,
}

impl LogText {
    pub fn captured(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fetch_failed: false,
        }
    }

    pub fn fetch_error(reason: impl std::fmt::Display) -> Self {
        Self {
            text: format!("{} {}", FETCH_ERROR_MARKER, reason),
            fetch_failed: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn fetch_failed(&self) -> bool {
        self.fetch_failed
    }

    /// First `max_chars` characters, cut on a char boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }

    /// Cheap check for the markers the demo workload emits on failure.
    pub fn has_error_markers(&self) -> bool {
        self.text.contains("Error") || self.text.contains("500")
    }
}

impl std::fmt::Display for LogText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Anything that can produce recent logs for a workload label.
///
/// Implementations never fail: problems are reported as a [`LogText`] built
/// with [`LogText::fetch_error`] so downstream steps always receive text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self, label: &str) -> LogText;
}

/// Keep only the last `max_lines` lines of `text`.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }

    let mut tail = lines[lines.len() - max_lines..].join("\n");
    if text.ends_with('\n') {
        tail.push('\n');
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_carries_marker() {
        let logs = LogText::fetch_error("exit status: 1");
        assert!(logs.fetch_failed());
        assert!(logs.as_str().starts_with(FETCH_ERROR_MARKER));
        assert!(logs.as_str().contains("exit status: 1"));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let logs = LogText::captured("é".repeat(300));
        let preview = logs.preview(200);
        assert_eq!(preview.chars().count(), 200);
    }

    #[test]
    fn preview_of_short_text_is_whole_text() {
        let logs = LogText::captured("short");
        assert_eq!(logs.preview(200), "short");
    }

    #[test]
    fn error_markers() {
        assert!(LogText::captured("CRITICAL: Database Connection Timeout\nError").has_error_markers());
        assert!(LogText::captured("GET / HTTP/1.1\" 500 -").has_error_markers());
        assert!(!LogText::captured("Transaction processed successfully.").has_error_markers());
    }

    #[test]
    fn tail_keeps_last_lines() {
        let text = (1..=60).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n") + "\n";
        let tail = tail_lines(&text, 50);
        assert_eq!(tail.lines().count(), 50);
        assert!(tail.starts_with("line 11\n"));
        assert!(tail.ends_with("line 60\n"));
    }

    #[test]
    fn tail_leaves_short_text_alone() {
        assert_eq!(tail_lines("a\nb\n", 50), "a\nb\n");
        assert_eq!(tail_lines("", 50), "");
    }
}
