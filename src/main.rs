use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use rover_runner::config::{Overrides, RunConfig};
use rover_runner::{input, pipeline, BrowserTaskAgent, Envelope, Error, Failure};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rover-runner")]
#[command(about = "Run one LLM-driven browser task and print a JSON result")]
#[command(version)]
struct Cli {
    /// Task as JSON, e.g. '{"task": "...", "platform": "swiggy"}'
    task_json: Option<String>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Env file holding OPENAI_API_KEY and friends
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Directory for output.txt, agent_history.json and the HTML report
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Chat model (overrides ROVER_MODEL and config)
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum agent steps
    #[arg(long)]
    max_steps: Option<usize>,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Do not send screenshots to the model
    #[arg(long)]
    no_vision: bool,

    /// Give up on the agent after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Build the task from "action" and platform fields when "task" is absent
    #[arg(long)]
    compose: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let failure = Failure::from(Error::Usage(e.to_string().trim().to_string()));
            return emit(failure.envelope(), failure.exit_code());
        }
    };

    // Logs go to stderr; stdout carries only the envelope.
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    match run(cli).await {
        Ok(envelope) => emit(envelope, 0),
        Err(failure) => emit(failure.envelope(), failure.exit_code()),
    }
}

async fn run(cli: Cli) -> Result<Envelope, Failure> {
    let raw = cli.task_json.as_deref().ok_or(Error::MissingArgument)?;
    let request = input::parse_request(raw, cli.compose)?;

    let overrides = Overrides {
        model: cli.model,
        max_steps: cli.max_steps,
        headless: cli.headless,
        no_vision: cli.no_vision,
        timeout_secs: cli.timeout_secs,
        output_dir: cli.output_dir,
    };
    let config = RunConfig::load(cli.config.as_deref(), &cli.env_file, &overrides)
        .map_err(|e| Failure::new(e, request.platform.clone()))?;
    debug!("Resolved config: {:?}", config);

    let agent = BrowserTaskAgent::new(config.llm.clone(), config.agent.clone());
    pipeline::run(&request, &agent, &config.output, config.timeout).await
}

fn emit(envelope: Envelope, code: i32) -> ExitCode {
    println!("{}", envelope.to_json_line());
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
