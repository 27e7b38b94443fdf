//! The model's answer format and the actions it can request.
//!
//! Each step the model returns one JSON object:
//!
//! ```json
//! {
//!   "current_state": {
//!     "evaluation_previous_goal": "Success - the login form is visible",
//!     "memory": "On the login page, nothing filled yet",
//!     "next_goal": "Enter the username"
//!   },
//!   "action": [{"input_text": {"index": 2, "text": "alice"}}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::ActionResult;
use crate::observe::InteractiveElement;
use crate::session::BrowserSession;
use crate::{Error, Result};

/// Page text returned by `extract_content` is truncated to this many chars.
const MAX_EXTRACT_CHARS: usize = 4000;

/// Longest pause a single `wait` action may request.
pub const MAX_WAIT_SECS: u64 = 60;

const REDACTED: &str = "********";

/// The model's reasoning for the current step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentBrain {
    #[serde(default)]
    pub evaluation_previous_goal: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub next_goal: String,
}

/// One parsed model answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    #[serde(default)]
    pub current_state: AgentBrain,
    #[serde(default)]
    pub action: Vec<Action>,
}

impl AgentOutput {
    /// Parse a model answer, tolerating markdown fences and surrounding prose.
    pub fn parse(content: &str) -> Result<Self> {
        let start = content.find('{');
        let end = content.rfind('}');
        let json = match (start, end) {
            (Some(s), Some(e)) if s < e => &content[s..=e],
            _ => {
                return Err(Error::InvalidAction(format!(
                    "model answer contains no JSON object: {}",
                    truncate(content, 200)
                )))
            }
        };
        let output: AgentOutput = serde_json::from_str(json)?;
        if output.action.is_empty() {
            return Err(Error::InvalidAction("model answer has no actions".into()));
        }
        Ok(output)
    }
}

fn default_true() -> bool {
    true
}

/// A browser action. Serialized externally tagged: `{"click_element": {"index": 3}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GoToUrl {
        url: String,
    },
    GoBack {},
    ClickElement {
        index: usize,
    },
    InputText {
        index: usize,
        text: String,
    },
    SendKeys {
        keys: String,
    },
    ScrollDown {
        #[serde(default)]
        amount: Option<i64>,
    },
    ScrollUp {
        #[serde(default)]
        amount: Option<i64>,
    },
    ExtractContent {
        #[serde(default)]
        goal: String,
    },
    Wait {
        #[serde(default = "default_wait_seconds")]
        seconds: u64,
    },
    Done {
        text: String,
        #[serde(default = "default_true")]
        success: bool,
    },
}

fn default_wait_seconds() -> u64 {
    3
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::GoToUrl { .. } => "go_to_url",
            Action::GoBack {} => "go_back",
            Action::ClickElement { .. } => "click_element",
            Action::InputText { .. } => "input_text",
            Action::SendKeys { .. } => "send_keys",
            Action::ScrollDown { .. } => "scroll_down",
            Action::ScrollUp { .. } => "scroll_up",
            Action::ExtractContent { .. } => "extract_content",
            Action::Wait { .. } => "wait",
            Action::Done { .. } => "done",
        }
    }

    /// Whether element indices from the last observation are stale afterwards.
    pub fn changes_page(&self) -> bool {
        matches!(
            self,
            Action::GoToUrl { .. } | Action::GoBack {} | Action::ClickElement { .. }
        )
    }

    /// Run the action against the session.
    pub async fn execute(&self, session: &mut BrowserSession) -> Result<ActionResult> {
        debug!("action: {:?}", self);
        match self {
            Action::GoToUrl { url } => {
                session.goto(url).await?;
                Ok(ActionResult::content(format!("Navigated to {}", url)))
            }
            Action::GoBack {} => {
                session.back().await?;
                let url = session.url().await.unwrap_or_default();
                Ok(ActionResult::content(format!("Navigated back to {}", url)))
            }
            Action::ClickElement { index } => {
                let label = session.click(*index).await?;
                Ok(ActionResult::content(format!("Clicked {}", label)))
            }
            Action::InputText { index, text } => {
                session.fill(*index, text).await?;
                Ok(ActionResult::content(format!(
                    "Input {} into element [{}]",
                    redact_if_secret(session, *index, text),
                    index
                )))
            }
            Action::SendKeys { keys } => {
                session.press_key(keys).await?;
                Ok(ActionResult::content(format!("Sent keys: {}", keys)))
            }
            Action::ScrollDown { amount } => {
                session.scroll(*amount, true).await?;
                Ok(ActionResult::content(scroll_message("down", *amount)))
            }
            Action::ScrollUp { amount } => {
                session.scroll(*amount, false).await?;
                Ok(ActionResult::content(scroll_message("up", *amount)))
            }
            Action::ExtractContent { goal } => {
                let text = session.text().await?;
                let url = session.url().await.unwrap_or_default();
                Ok(ActionResult::content(format!(
                    "Extracted from {} ({}):\n{}",
                    url,
                    if goal.is_empty() { "page text" } else { goal },
                    truncate(&text, MAX_EXTRACT_CHARS)
                )))
            }
            Action::Wait { seconds } => {
                let seconds = clamp_wait(*seconds);
                session.wait(seconds.saturating_mul(1000)).await;
                Ok(ActionResult::content(format!("Waited {} seconds", seconds)))
            }
            Action::Done { text, success } => Ok(ActionResult::done(text.clone(), *success)),
        }
    }
}

fn scroll_message(direction: &str, amount: Option<i64>) -> String {
    match amount {
        Some(px) => format!("Scrolled {} by {} pixels", direction, px),
        None => format!("Scrolled {} one page", direction),
    }
}

fn clamp_wait(seconds: u64) -> u64 {
    seconds.min(MAX_WAIT_SECS)
}

fn is_password(elements: &[InteractiveElement], index: usize) -> bool {
    elements
        .iter()
        .find(|el| el.index == index)
        .and_then(|el| el.input_type.as_deref())
        .map(|t| t.eq_ignore_ascii_case("password"))
        .unwrap_or(false)
}

fn redact_if_secret(session: &BrowserSession, index: usize, text: &str) -> String {
    if is_password(session.elements(), index) {
        REDACTED.to_string()
    } else {
        format!("\"{}\"", text)
    }
}

/// Mask `input_text` values aimed at password fields of `elements`, the
/// observation the model answered. Applied before the output is recorded, so
/// typed passwords reach neither the result text nor the history file.
pub fn redact_secrets(output: &mut AgentOutput, elements: &[InteractiveElement]) {
    for action in &mut output.action {
        if let Action::InputText { index, text } = action {
            if is_password(elements, *index) {
                *text = REDACTED.to_string();
            }
        }
    }
}

/// Truncate to at most `max` chars on a char boundary.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
