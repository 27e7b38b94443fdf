//! Step history of an agent run, persisted as JSON.
//!
//! The file layout is `{"history": [step, ...]}` where each step is
//! `{model_output, result, state, metadata}`. Screenshots are stored inline as
//! base64 PNG so the file is self-contained.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::AgentOutput;
use crate::Result;

/// Outcome of one executed action (or of a failed step).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Set by the `done` action.
    #[serde(default)]
    pub is_done: bool,
    /// Only meaningful when `is_done` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default)]
    pub extracted_content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Whether the content is fed back to the model on later steps.
    #[serde(default)]
    pub include_in_memory: bool,
}

impl ActionResult {
    /// A successful action with a short description of what happened.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(text.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }

    /// The final answer of the run.
    pub fn done(text: impl Into<String>, success: bool) -> Self {
        Self {
            is_done: true,
            success: Some(success),
            extracted_content: Some(text.into()),
            include_in_memory: false,
            error: None,
        }
    }
}

/// Browser state observed at the start of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserStateHistory {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Number of interactive elements the model was shown.
    #[serde(default)]
    pub interactive_elements: usize,
    /// Base64-encoded PNG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    pub step_number: usize,
    /// Unix seconds.
    pub step_start_time: f64,
    pub step_end_time: f64,
}

impl StepMetadata {
    pub fn duration_seconds(&self) -> f64 {
        self.step_end_time - self.step_start_time
    }
}

/// One agent step: what the model decided, what happened, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHistory {
    /// `None` when the model call failed or its answer could not be parsed.
    pub model_output: Option<AgentOutput>,
    #[serde(default)]
    pub result: Vec<ActionResult>,
    #[serde(default)]
    pub state: BrowserStateHistory,
    #[serde(default)]
    pub metadata: Option<StepMetadata>,
}

/// Ordered record of every step of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentHistoryList {
    pub history: Vec<AgentHistory>,
}

impl AgentHistoryList {
    pub fn push(&mut self, step: AgentHistory) {
        self.history.push(step);
    }

    /// Extracted content of the last result of the last step.
    pub fn final_result(&self) -> Option<&str> {
        self.last_result()?.extracted_content.as_deref()
    }

    /// Whether the run ended with a `done` action.
    pub fn is_done(&self) -> bool {
        self.last_result().map(|r| r.is_done).unwrap_or(false)
    }

    /// The success flag reported by `done`, if the run finished.
    pub fn is_successful(&self) -> Option<bool> {
        let last = self.last_result()?;
        if last.is_done {
            last.success
        } else {
            None
        }
    }

    /// Every action result of every step, in order.
    pub fn action_results(&self) -> Vec<&ActionResult> {
        self.history.iter().flat_map(|h| h.result.iter()).collect()
    }

    pub fn number_of_steps(&self) -> usize {
        self.history.len()
    }

    /// First error of each step (`None` for clean steps).
    pub fn errors(&self) -> Vec<Option<&str>> {
        self.history
            .iter()
            .map(|h| h.result.iter().find_map(|r| r.error.as_deref()))
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().iter().any(Option::is_some)
    }

    /// Page URL at the start of each step.
    pub fn urls(&self) -> Vec<&str> {
        self.history.iter().map(|h| h.state.url.as_str()).collect()
    }

    /// Total wall time across steps that carry timing metadata.
    pub fn total_duration_seconds(&self) -> f64 {
        self.history
            .iter()
            .filter_map(|h| h.metadata.as_ref())
            .map(StepMetadata::duration_seconds)
            .sum()
    }

    /// Write the history as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn last_result(&self) -> Option<&ActionResult> {
        self.history.last()?.result.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, AgentBrain};

    fn step(url: &str, results: Vec<ActionResult>) -> AgentHistory {
        AgentHistory {
            model_output: Some(AgentOutput {
                current_state: AgentBrain {
                    evaluation_previous_goal: "Unknown".into(),
                    memory: String::new(),
                    next_goal: format!("work on {}", url),
                },
                action: vec![Action::GoToUrl { url: url.into() }],
            }),
            result: results,
            state: BrowserStateHistory {
                url: url.into(),
                title: "Title".into(),
                interactive_elements: 0,
                screenshot: None,
            },
            metadata: Some(StepMetadata {
                step_number: 1,
                step_start_time: 10.0,
                step_end_time: 12.5,
            }),
        }
    }

    #[test]
    fn test_empty_history() {
        let history = AgentHistoryList::default();
        assert_eq!(history.number_of_steps(), 0);
        assert_eq!(history.final_result(), None);
        assert!(!history.is_done());
        assert_eq!(history.is_successful(), None);
        assert!(history.action_results().is_empty());
    }

    #[test]
    fn test_final_result_is_last_result_of_last_step() {
        let mut history = AgentHistoryList::default();
        history.push(step("https://a.test", vec![ActionResult::content("opened a")]));
        history.push(step(
            "https://b.test",
            vec![
                ActionResult::content("clicked"),
                ActionResult::done("Logged in at https://b.test/home", true),
            ],
        ));

        assert_eq!(history.number_of_steps(), 2);
        assert_eq!(history.final_result(), Some("Logged in at https://b.test/home"));
        assert!(history.is_done());
        assert_eq!(history.is_successful(), Some(true));
        assert_eq!(history.action_results().len(), 3);
        assert_eq!(history.urls(), vec!["https://a.test", "https://b.test"]);
        assert!((history.total_duration_seconds() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_errors_per_step() {
        let mut history = AgentHistoryList::default();
        history.push(step("https://a.test", vec![ActionResult::content("ok")]));
        history.push(step("https://a.test", vec![ActionResult::error("element [9] not found")]));

        assert_eq!(history.errors(), vec![None, Some("element [9] not found")]);
        assert!(history.has_errors());
        assert_eq!(history.final_result(), None);
        assert!(!history.is_done());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agent_history.json");

        let mut history = AgentHistoryList::default();
        let mut first = step("https://a.test", vec![ActionResult::done("finished", false)]);
        first.state.screenshot = Some("iVBORw0KGgo=".into());
        history.push(first);
        history.save_to_file(&path).unwrap();

        let loaded = AgentHistoryList::load_from_file(&path).unwrap();
        assert_eq!(loaded, history);
        assert_eq!(loaded.is_successful(), Some(false));
    }

    #[test]
    fn test_saved_layout() {
        let mut history = AgentHistoryList::default();
        history.push(step("https://a.test", vec![ActionResult::content("opened")]));
        let value = serde_json::to_value(&history).unwrap();

        let first = &value["history"][0];
        assert_eq!(first["state"]["url"], "https://a.test");
        assert!(first["state"].get("screenshot").is_none());
        assert_eq!(first["result"][0]["extracted_content"], "opened");
        assert_eq!(first["model_output"]["current_state"]["next_goal"], "work on https://a.test");
        assert_eq!(first["model_output"]["action"][0]["go_to_url"]["url"], "https://a.test");
    }

    #[test]
    fn test_failed_step_has_null_model_output() {
        let json = r#"{"history":[{
            "model_output": null,
            "result": [{"error": "timeout"}],
            "state": {"url": "about:blank", "title": ""}
        }]}"#;
        let history: AgentHistoryList = serde_json::from_str(json).unwrap();
        assert!(history.history[0].model_output.is_none());
        assert_eq!(history.errors(), vec![Some("timeout")]);
    }
}
