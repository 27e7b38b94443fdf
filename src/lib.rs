//! # rover-runner
//!
//! Runs one browser task end to end: parse the JSON task argument, drive a
//! [`rover_agent::Agent`] to completion, persist its history, render an HTML
//! report, and summarize the outcome as a single JSON [`Envelope`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rover_runner::{config, input, pipeline, BrowserTaskAgent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let raw = r#"{"task": "Open example.com and report the heading", "platform": "demo"}"#;
//! let envelope = async {
//!     let request = input::parse_request(raw, false)?;
//!     let overrides = config::Overrides::default();
//!     let run_config = config::RunConfig::load(None, ".env".as_ref(), &overrides)
//!         .map_err(|e| pipeline::Failure::new(e, request.platform.clone()))?;
//!     let agent = BrowserTaskAgent::new(run_config.llm.clone(), run_config.agent.clone());
//!     pipeline::run(&request, &agent, &run_config.output, run_config.timeout).await
//! }
//! .await
//! .unwrap_or_else(|failure| failure.envelope());
//! println!("{}", envelope.to_json_line());
//! # }
//! ```

pub mod config;
pub mod envelope;
pub mod input;
pub mod invoke;
pub mod pipeline;
pub mod report;
pub mod summary;
pub mod tasks;

use std::path::PathBuf;

pub use config::{OutputPaths, RunConfig};
pub use envelope::Envelope;
pub use input::TaskRequest;
pub use invoke::{BrowserTaskAgent, RunOutcome, TaskAgent};
pub use pipeline::Failure;
pub use summary::LoginStatus;

/// Result type for rover-runner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end a run with an error envelope.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No task data provided")]
    MissingArgument,

    #[error("invalid command line: {0}")]
    Usage(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    AgentFailure(String),

    #[error("report io error on {}: {source}", path.display())]
    ReportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<rover_agent::Error> for Error {
    fn from(e: rover_agent::Error) -> Self {
        Error::AgentFailure(e.to_string())
    }
}

impl Error {
    pub(crate) fn report_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ReportIo {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure. Only an unusable command line is nonzero.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingArgument | Error::Usage(_) => 1,
            _ => 0,
        }
    }
}
