//! End-to-end pipeline runs against a scripted agent.

use async_trait::async_trait;
use rover_agent::{
    Action, ActionResult, AgentBrain, AgentHistory, AgentHistoryList, AgentOutput,
    BrowserStateHistory, StepMetadata,
};
use rover_runner::config::OutputPaths;
use rover_runner::envelope::Envelope;
use rover_runner::{input, pipeline, Error, TaskAgent};

/// Replays a fixed history, or fails like a crashed browser.
struct MockAgent {
    history: Option<AgentHistoryList>,
}

#[async_trait]
impl TaskAgent for MockAgent {
    async fn run(&self, _task: &str) -> rover_runner::Result<AgentHistoryList> {
        self.history
            .clone()
            .ok_or_else(|| Error::AgentFailure("browser error: Chrome exited unexpectedly".into()))
    }
}

fn step(
    n: usize,
    url: &str,
    goal: &str,
    screenshot: Option<&str>,
    result: ActionResult,
) -> AgentHistory {
    AgentHistory {
        model_output: Some(AgentOutput {
            current_state: AgentBrain {
                evaluation_previous_goal: "Success".into(),
                memory: format!("step {}", n),
                next_goal: goal.into(),
            },
            action: vec![Action::GoToUrl { url: url.into() }],
        }),
        result: vec![result],
        state: BrowserStateHistory {
            url: url.into(),
            title: format!("Page {}", n),
            interactive_elements: 4,
            screenshot: screenshot.map(str::to_string),
        },
        metadata: Some(StepMetadata {
            step_number: n,
            step_start_time: 100.0 + n as f64,
            step_end_time: 100.5 + n as f64,
        }),
    }
}

fn login_history() -> AgentHistoryList {
    let mut history = AgentHistoryList::default();
    history.push(step(
        1,
        "https://partner.test/login",
        "Open the login page",
        Some("iVBORw0KGgo="),
        ActionResult::content("Navigated to https://partner.test/login"),
    ));
    history.push(step(
        2,
        "https://partner.test/login",
        "Submit credentials",
        None,
        ActionResult::content("Clicked element [3]"),
    ));
    history.push(step(
        3,
        "https://partner.test/dashboard",
        "Report the result",
        Some("iVBORw0KGgo="),
        ActionResult::done(
            "Login successful! Now on https://partner.test/dashboard.",
            true,
        ),
    ));
    history
}

#[tokio::test]
async fn test_success_envelope_and_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let paths = OutputPaths::new(dir.path());
    let request =
        input::parse_request(r#"{"task": "Log in", "platform": "swiggy"}"#, false).unwrap();
    let agent = MockAgent {
        history: Some(login_history()),
    };

    let envelope = pipeline::run(&request, &agent, &paths, None).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&envelope.to_json_line()).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["platform"], "swiggy");
    assert_eq!(value["data"]["platform"], "swiggy");
    assert_eq!(value["login_status"], "success");
    assert_eq!(value["final_url"], "https://partner.test/dashboard");
    assert_eq!(value["result"], "Login successful! Now on https://partner.test/dashboard.");

    assert_eq!(
        std::fs::read_to_string(paths.result()).unwrap(),
        "Login successful! Now on https://partner.test/dashboard."
    );
    let saved = AgentHistoryList::load_from_file(paths.history()).unwrap();
    assert_eq!(saved.number_of_steps(), 3);

    let html = std::fs::read_to_string(paths.report()).unwrap();
    assert_eq!(html.matches(r#"<td class="stepnum">"#).count(), 3);
    for n in 1..=3 {
        assert!(html.contains(&format!(r#"<td class="stepnum">{}</td>"#, n)));
    }
    assert_eq!(html.matches(r#"<td class="screenshot-cell"></td>"#).count(), 1);
    assert!(html.contains(r#"<td class="goal">Submit credentials</td>"#));
}

#[tokio::test]
async fn test_success_without_platform() {
    let dir = tempfile::tempdir().unwrap();
    let request = input::parse_request(r#"{"task": "Check the weather"}"#, false).unwrap();
    let mut history = AgentHistoryList::default();
    history.push(step(
        1,
        "https://weather.test",
        "Read forecast",
        None,
        ActionResult::done("Sunny, 31C", true),
    ));
    let agent = MockAgent {
        history: Some(history),
    };

    let envelope = pipeline::run(&request, &agent, &OutputPaths::new(dir.path()), None)
        .await
        .unwrap();
    match envelope {
        Envelope::Success(success) => {
            assert_eq!(success.platform, "");
            assert_eq!(success.message, "Browser automation completed for ");
            assert_eq!(success.final_url, "");
            assert_eq!(success.login_status.as_str(), "completed");
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_agent_failure_becomes_error_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let request =
        input::parse_request(r#"{"task": "Log in", "platform": "zomato"}"#, false).unwrap();
    let agent = MockAgent { history: None };

    let failure = pipeline::run(&request, &agent, &OutputPaths::new(dir.path()), None)
        .await
        .unwrap_err();
    assert_eq!(failure.exit_code(), 0);
    match failure.envelope() {
        Envelope::Error(e) => {
            assert_eq!(e.platform, "zomato");
            assert_eq!(e.error, "browser error: Chrome exited unexpectedly");
            assert_eq!(
                e.message,
                "Browser automation failed: browser error: Chrome exited unexpectedly"
            );
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert!(!dir.path().join("agent_history_report.html").exists());
}

#[tokio::test]
async fn test_unfinished_run_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let paths = OutputPaths::new(dir.path());
    let request =
        input::parse_request(r#"{"task": "Log in", "platform": "magicpin"}"#, false).unwrap();
    let mut history = AgentHistoryList::default();
    history.push(AgentHistory {
        model_output: None,
        result: vec![ActionResult::error("llm error: API returned 500")],
        state: BrowserStateHistory::default(),
        metadata: None,
    });
    let agent = MockAgent {
        history: Some(history),
    };

    let failure = pipeline::run(&request, &agent, &paths, None).await.unwrap_err();
    assert!(matches!(failure.error, Error::AgentFailure(_)));
    assert_eq!(failure.platform.as_deref(), Some("magicpin"));
    assert!(paths.history().exists());
}
