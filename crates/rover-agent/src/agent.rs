use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::action::{redact_secrets, truncate, Action, AgentOutput};
use crate::history::{ActionResult, AgentHistory, AgentHistoryList, StepMetadata};
use crate::llm::{ChatModel, Completion};
use crate::prompt;
use crate::session::{BrowserConfig, BrowserSession, BrowserState};
use crate::Result;

/// Limits and switches for one run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Hard cap on model round trips.
    pub max_steps: usize,
    /// Actions beyond this in a single answer are ignored.
    pub max_actions_per_step: usize,
    /// Consecutive failed steps before giving up.
    pub max_failures: usize,
    /// Send a screenshot with every step and keep it in the history.
    pub use_vision: bool,
    /// Earlier-step summaries sent back to the model.
    pub memory_len: usize,
    pub browser: BrowserConfig,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 100,
            max_actions_per_step: 10,
            max_failures: 3,
            use_vision: true,
            memory_len: 20,
            browser: BrowserConfig::default(),
        }
    }
}

/// Answers one step's messages.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[Value]) -> Result<Completion>;
}

#[async_trait]
impl LanguageModel for ChatModel {
    async fn complete(&self, messages: &[Value]) -> Result<Completion> {
        ChatModel::complete(self, messages).await
    }
}

/// The page the agent observes and acts on.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn state(&mut self, with_screenshot: bool) -> Result<BrowserState>;
    async fn execute(&mut self, action: &Action) -> Result<ActionResult>;
}

#[async_trait]
impl BrowserDriver for BrowserSession {
    async fn state(&mut self, with_screenshot: bool) -> Result<BrowserState> {
        BrowserSession::state(self, with_screenshot).await
    }

    async fn execute(&mut self, action: &Action) -> Result<ActionResult> {
        action.execute(self).await
    }
}

/// Runs one natural-language task in a fresh browser.
pub struct Agent {
    task: String,
    llm: ChatModel,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(task: impl Into<String>, llm: ChatModel) -> Self {
        Self::with_settings(task, llm, AgentSettings::default())
    }

    pub fn with_settings(task: impl Into<String>, llm: ChatModel, settings: AgentSettings) -> Self {
        Self {
            task: task.into(),
            llm,
            settings,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Launch a browser, loop until `done`, the step limit, or too many
    /// consecutive failures, then close the browser.
    ///
    /// Step-level failures are recorded in the history; only a browser that
    /// cannot be launched is returned as an error.
    pub async fn run(&self) -> Result<AgentHistoryList> {
        info!(
            "Starting agent (model: {}, max steps: {})",
            self.llm.model_name(),
            self.settings.max_steps
        );
        let mut session = BrowserSession::launch(&self.settings.browser).await?;

        let history = run_loop(&self.task, &self.settings, &self.llm, &mut session).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser: {}", e);
        }

        info!(
            "Agent finished after {} steps (done: {}, {:.1}s)",
            history.number_of_steps(),
            history.is_done(),
            history.total_duration_seconds()
        );
        Ok(history)
    }
}

/// The observe, ask, act loop over any model and driver.
async fn run_loop<M, D>(
    task: &str,
    settings: &AgentSettings,
    model: &M,
    driver: &mut D,
) -> AgentHistoryList
where
    M: LanguageModel + ?Sized,
    D: BrowserDriver + ?Sized,
{
    let mut history = AgentHistoryList::default();
    let mut memory: VecDeque<String> = VecDeque::with_capacity(settings.memory_len);
    let mut omitted = 0;
    let mut consecutive_failures = 0;

    for step in 1..=settings.max_steps {
        let started = unix_now();
        let state = match driver.state(settings.use_vision).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Step {}: failed to read browser state: {}", step, e);
                BrowserState::unknown()
            }
        };
        debug!("Step {}: {} ({} elements)", step, state.url, state.elements.len());

        let messages =
            prompt::build_messages(task, &memory, omitted, &state, step, settings.max_steps);

        let output = match model.complete(&messages).await {
            Ok(completion) => AgentOutput::parse(&completion.content),
            Err(e) => Err(e),
        };

        let (model_output, results) = match output {
            Ok(mut output) => {
                consecutive_failures = 0;
                info!("Step {}: {}", step, output.current_state.next_goal);
                let results =
                    execute_actions(driver, &output.action, settings.max_actions_per_step).await;
                redact_secrets(&mut output, &state.elements);
                (Some(output), results)
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!(
                    "Step {} failed ({}/{}): {}",
                    step, consecutive_failures, settings.max_failures, e
                );
                (None, vec![ActionResult::error(e.to_string())])
            }
        };

        if settings.memory_len > 0 {
            if memory.len() == settings.memory_len {
                memory.pop_front();
                omitted += 1;
            }
            memory.push_back(summarize_step(step, model_output.as_ref(), &results));
        }
        history.push(AgentHistory {
            model_output,
            result: results,
            state: state.to_history(),
            metadata: Some(StepMetadata {
                step_number: step,
                step_start_time: started,
                step_end_time: unix_now(),
            }),
        });

        if history.is_done() {
            break;
        }
        if consecutive_failures >= settings.max_failures.max(1) {
            warn!("Stopping after {} consecutive failures", consecutive_failures);
            break;
        }
    }

    if !history.is_done() {
        warn!("Agent stopped without completing the task");
    }
    history
}

/// Run at most `max_actions` actions in order, stopping at the first error, at
/// `done`, or after an action that invalidates element indices.
async fn execute_actions<D: BrowserDriver + ?Sized>(
    driver: &mut D,
    actions: &[Action],
    max_actions: usize,
) -> Vec<ActionResult> {
    let actions = &actions[..actions.len().min(max_actions)];
    let mut results = Vec::with_capacity(actions.len());

    for (i, action) in actions.iter().enumerate() {
        match driver.execute(action).await {
            Ok(result) => {
                let done = result.is_done;
                results.push(result);
                if done {
                    break;
                }
            }
            Err(e) => {
                debug!("{} failed: {}", action.name(), e);
                results.push(ActionResult::error(format!("{}: {}", action.name(), e)));
                break;
            }
        }
        if action.changes_page() && i + 1 < actions.len() {
            debug!(
                "Page changed after {}, dropping {} remaining actions",
                action.name(),
                actions.len() - i - 1
            );
            break;
        }
    }
    results
}

/// One memory line: the goal and what came of it.
fn summarize_step(step: usize, output: Option<&AgentOutput>, results: &[ActionResult]) -> String {
    let goal = output
        .map(|o| o.current_state.next_goal.as_str())
        .filter(|g| !g.is_empty())
        .unwrap_or("(no model output)");
    let outcomes: Vec<String> = results
        .iter()
        .filter_map(|r| match (&r.error, &r.extracted_content) {
            (Some(err), _) => Some(format!("error: {}", err)),
            (None, Some(content)) if r.include_in_memory => Some(truncate(content, 300)),
            _ => None,
        })
        .collect();
    format!("Step {}: {} -> {}", step, goal, outcomes.join("; "))
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
