//! # rover-agent
//!
//! LLM-driven browser agent. Each step the agent observes the page, asks a
//! chat model what to do next, executes the returned actions, and records the
//! step in an [`AgentHistoryList`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rover_agent::{Agent, ChatModel, LlmConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> rover_agent::Result<()> {
//! let llm = ChatModel::new(LlmConfig::new(std::env::var("OPENAI_API_KEY").unwrap_or_default()))?;
//! let agent = Agent::new("Find the price of the cheapest flight from BLR to DEL", llm);
//!
//! let history = agent.run().await?;
//! println!("{:?} after {} steps", history.final_result(), history.number_of_steps());
//! history.save_to_file("agent_history.json")?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod agent;
pub mod history;
pub mod llm;
pub mod observe;
mod prompt;
pub mod session;

pub use action::{redact_secrets, Action, AgentBrain, AgentOutput};
pub use agent::{Agent, AgentSettings, BrowserDriver, LanguageModel};
pub use history::{ActionResult, AgentHistory, AgentHistoryList, BrowserStateHistory, StepMetadata};
pub use llm::{ChatModel, Completion, LlmConfig, Usage};
pub use observe::InteractiveElement;
pub use session::{BrowserConfig, BrowserSession, BrowserState};

/// Result type for rover-agent operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid action: {0}")]
    InvalidAction(String),
}
