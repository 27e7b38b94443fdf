//! Running the agent and persisting what it produced.

use std::time::Duration;

use async_trait::async_trait;
use rover_agent::{ActionResult, Agent, AgentHistoryList, AgentSettings, ChatModel, LlmConfig};
use tracing::{debug, info};

use crate::config::OutputPaths;
use crate::{Error, Result};

/// Something that can carry out a natural-language task and report its steps.
#[async_trait]
pub trait TaskAgent: Send + Sync {
    async fn run(&self, task: &str) -> Result<AgentHistoryList>;
}

/// [`TaskAgent`] backed by a real browser and chat model.
#[derive(Debug, Clone)]
pub struct BrowserTaskAgent {
    llm: LlmConfig,
    settings: AgentSettings,
}

impl BrowserTaskAgent {
    pub fn new(llm: LlmConfig, settings: AgentSettings) -> Self {
        Self { llm, settings }
    }
}

#[async_trait]
impl TaskAgent for BrowserTaskAgent {
    async fn run(&self, task: &str) -> Result<AgentHistoryList> {
        let model = ChatModel::new(self.llm.clone())?;
        let agent = Agent::with_settings(task, model, self.settings.clone());
        Ok(agent.run().await?)
    }
}

/// What the runner keeps from a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub final_result: String,
    pub steps: usize,
    pub action_results: Vec<ActionResult>,
}

/// Run `task` to completion (or `timeout`), then write `output.txt` and
/// `agent_history.json` under `paths`.
///
/// The history is persisted even when the run produced no final result.
pub async fn invoke<A: TaskAgent + ?Sized>(
    agent: &A,
    task: &str,
    paths: &OutputPaths,
    timeout: Option<Duration>,
) -> Result<RunOutcome> {
    info!("Running task: {}", task);
    let history = match timeout {
        Some(limit) => tokio::time::timeout(limit, agent.run(task))
            .await
            .map_err(|_| Error::AgentFailure(format!("agent timed out after {:?}", limit)))??,
        None => agent.run(task).await?,
    };

    std::fs::create_dir_all(&paths.dir).map_err(|e| Error::report_io(&paths.dir, e))?;
    let history_path = paths.history();
    history.save_to_file(&history_path).map_err(|e| {
        let source = match e {
            rover_agent::Error::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        };
        Error::report_io(&history_path, source)
    })?;
    debug!("Saved history to {}", history_path.display());

    let final_result = history
        .final_result()
        .map(str::to_string)
        .ok_or_else(|| Error::AgentFailure("agent finished without a final result".into()))?;

    let result_path = paths.result();
    std::fs::write(&result_path, &final_result).map_err(|e| Error::report_io(&result_path, e))?;

    let outcome = RunOutcome {
        steps: history.number_of_steps(),
        action_results: history.action_results().into_iter().cloned().collect(),
        final_result,
    };
    info!("Final output: {}", outcome.final_result);
    info!("Actions: {}", outcome.action_results.len());
    for (i, result) in outcome.action_results.iter().enumerate() {
        debug!("  {}: {:?}", i + 1, result);
    }
    info!("Total steps: {}", outcome.steps);
    Ok(outcome)
}
