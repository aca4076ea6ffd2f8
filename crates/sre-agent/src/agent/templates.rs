//! Diagnosis Prompt Template
//!
//! The fixed instruction text that wraps captured logs before they are sent
//! to a backend.

/// Placeholder replaced by the captured logs.
const LOGS_PLACEHOLDER: &str = "{{logs}}";

/// Prompt sent to the backend for every run.
pub const DIAGNOSIS_PROMPT_TEMPLATE: &str = r#"
You are a Senior Site Reliability Engineer.
Analyze these Kubernetes logs for errors.

Logs:
{{logs}}

Task:
1. Identify the HTTP status code and error message.
2. Suggest a specific kubectl command to verify the pod status.
3. Suggest a fix for the underlying issue.
"#;

/// Build the diagnosis prompt for `logs`.
///
/// The logs are inserted verbatim, so the same input always yields the same
/// prompt.
pub fn build_diagnosis_prompt(logs: &str) -> String {
    // Split on the placeholder instead of `str::replace` so a literal
    // `{{logs}}` inside the captured text is left untouched.
    match DIAGNOSIS_PROMPT_TEMPLATE.split_once(LOGS_PLACEHOLDER) {
        Some((head, tail)) => {
            let mut prompt = String::with_capacity(head.len() + logs.len() + tail.len());
            prompt.push_str(head);
            prompt.push_str(logs);
            prompt.push_str(tail);
            prompt
        }
        None => format!("{}\n{}", DIAGNOSIS_PROMPT_TEMPLATE, logs),
    }
}
