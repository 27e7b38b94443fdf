//! Best-effort interpretation of the agent's final answer.
//!
//! Neither heuristic verifies anything against the page; they only look at the
//! words and links the model chose to report.

use regex::Regex;
use serde::Serialize;

/// What the final answer says about the login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Success,
    Failed,
    Completed,
}

impl LoginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStatus::Success => "success",
            LoginStatus::Failed => "failed",
            LoginStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify on lowercased text. "success" wins over "failed"/"error" when both appear.
pub fn classify_login_status(text: &str) -> LoginStatus {
    let lower = text.to_lowercase();
    if lower.contains("success") {
        // "successfully" contains "success"
        LoginStatus::Success
    } else if lower.contains("failed") || lower.contains("error") {
        LoginStatus::Failed
    } else {
        LoginStatus::Completed
    }
}

/// First `https://` link in the text, without trailing sentence punctuation.
pub fn extract_final_url(text: &str) -> Option<String> {
    let re = Regex::new(r"https://\S+").ok()?;
    let url = re
        .find(text)?
        .as_str()
        .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '"', '\'']);
    if url.len() <= "https://".len() {
        return None;
    }
    Some(url.to_string())
}

/// Login status plus final URL (empty when none was found).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub login_status: LoginStatus,
    pub final_url: String,
}

pub fn summarize(final_result: &str) -> Summary {
    Summary {
        login_status: classify_login_status(final_result),
        final_url: extract_final_url(final_result).unwrap_or_default(),
    }
}
