//! The single JSON line printed on stdout.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::summary::{LoginStatus, Summary};

/// Platform label used when the input could not be read far enough to find one.
pub const UNKNOWN_PLATFORM: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success(SuccessEnvelope),
    Error(ErrorEnvelope),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessEnvelope {
    pub platform: String,
    pub login_status: LoginStatus,
    pub final_url: String,
    pub result: String,
    pub message: String,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeData {
    pub platform: String,
    pub status: LoginStatus,
    pub url: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub platform: String,
    pub message: String,
}

impl Envelope {
    pub fn success(platform: &str, final_result: &str, summary: Summary) -> Self {
        Envelope::Success(SuccessEnvelope {
            platform: platform.to_string(),
            login_status: summary.login_status,
            final_url: summary.final_url.clone(),
            result: final_result.to_string(),
            message: format!("Browser automation completed for {}", platform),
            data: EnvelopeData {
                platform: platform.to_string(),
                status: summary.login_status,
                url: summary.final_url,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        })
    }

    pub fn error(error: impl Into<String>, platform: Option<&str>) -> Self {
        let error = error.into();
        let message = format!("Browser automation failed: {}", error);
        Self::error_with_message(error, platform, message)
    }

    pub fn error_with_message(
        error: impl Into<String>,
        platform: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Envelope::Error(ErrorEnvelope {
            error: error.into(),
            platform: platform.unwrap_or(UNKNOWN_PLATFORM).to_string(),
            message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// Compact JSON without a trailing newline.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "error": format!("failed to encode result: {}", e),
                "platform": UNKNOWN_PLATFORM,
                "message": "Browser automation failed: failed to encode result",
            })
            .to_string()
        })
    }
}
