//! The whole run, from parsed request to envelope.

use std::time::Duration;

use tracing::{error, info};

use crate::config::OutputPaths;
use crate::envelope::Envelope;
use crate::input::TaskRequest;
use crate::invoke::{self, TaskAgent};
use crate::{report, summary, Error};

/// A terminal error plus the platform, when the input got far enough to name one.
#[derive(Debug)]
pub struct Failure {
    pub error: Error,
    pub platform: Option<String>,
}

impl Failure {
    pub fn new(error: Error, platform: Option<String>) -> Self {
        Self { error, platform }
    }

    pub fn envelope(&self) -> Envelope {
        match self.error {
            Error::MissingArgument => Envelope::error_with_message(
                self.error.to_string(),
                self.platform.as_deref(),
                "Task data is required",
            ),
            _ => Envelope::error(self.error.to_string(), self.platform.as_deref()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self::new(error, None)
    }
}

/// Run the agent, write the report, and summarize the final result.
pub async fn run<A: TaskAgent + ?Sized>(
    request: &TaskRequest,
    agent: &A,
    paths: &OutputPaths,
    timeout: Option<Duration>,
) -> Result<Envelope, Failure> {
    let platform = request.platform();
    let fail = |e: Error| {
        error!("Browser automation failed: {}", e);
        Failure::new(e, request.platform.clone())
    };

    let outcome = invoke::invoke(agent, request.task(), paths, timeout)
        .await
        .map_err(fail)?;
    report::write_report(&paths.history(), &paths.report()).map_err(fail)?;

    let summary = summary::summarize(&outcome.final_result);
    info!(
        "Login status: {}, final URL: {}",
        summary.login_status,
        if summary.final_url.is_empty() { "(none)" } else { &summary.final_url }
    );
    Ok(Envelope::success(platform, &outcome.final_result, summary))
}
