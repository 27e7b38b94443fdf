//! Run configuration: YAML file, env file, process environment and CLI flags.
//!
//! Precedence, highest first: command-line flags, process environment, env
//! file, YAML file, built-in defaults. The env file is read into a map; the
//! process environment is never modified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rover_agent::{AgentSettings, BrowserConfig, LlmConfig};
use serde::Deserialize;

use crate::{Error, Result};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const API_BASE_VAR: &str = "OPENAI_API_BASE";
pub const MODEL_VAR: &str = "ROVER_MODEL";

/// Optional YAML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub browser: BrowserSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
    pub max_actions_per_step: usize,
    pub max_failures: usize,
    pub use_vision: bool,
    pub memory_len: usize,
    /// Bound on the whole run, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for AgentSection {
    fn default() -> Self {
        let settings = AgentSettings::default();
        Self {
            max_steps: settings.max_steps,
            max_actions_per_step: settings.max_actions_per_step,
            max_failures: settings.max_failures,
            use_vision: settings.use_vision,
            memory_len: settings.memory_len,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Only offer elements inside the viewport to the model.
    pub viewport_only: bool,
}

impl Default for BrowserSection {
    fn default() -> Self {
        let browser = BrowserConfig::default();
        Self {
            headless: browser.headless,
            proxy: browser.proxy,
            user_agent: browser.user_agent,
            viewport_width: browser.viewport_width,
            viewport_height: browser.viewport_height,
            viewport_only: browser.viewport_only,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-default config.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Values taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub max_steps: Option<usize>,
    pub headless: bool,
    pub no_vision: bool,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

/// Where a run writes its three files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub dir: PathBuf,
}

impl OutputPaths {
    pub const RESULT_FILE: &'static str = "output.txt";
    pub const HISTORY_FILE: &'static str = "agent_history.json";
    pub const REPORT_FILE: &'static str = "agent_history_report.html";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn result(&self) -> PathBuf {
        self.dir.join(Self::RESULT_FILE)
    }

    pub fn history(&self) -> PathBuf {
        self.dir.join(Self::HISTORY_FILE)
    }

    pub fn report(&self) -> PathBuf {
        self.dir.join(Self::REPORT_FILE)
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Everything one run needs, fully resolved.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub llm: LlmConfig,
    pub agent: AgentSettings,
    pub output: OutputPaths,
    /// `None` waits for the agent indefinitely.
    pub timeout: Option<Duration>,
}

impl RunConfig {
    /// Read the optional YAML file and the env file, then resolve.
    pub fn load(
        config_path: Option<&Path>,
        env_file: &Path,
        overrides: &Overrides,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let mut env = read_env_file(env_file)?;
        for key in [API_KEY_VAR, API_BASE_VAR, MODEL_VAR] {
            if let Ok(value) = std::env::var(key) {
                env.insert(key.to_string(), value);
            }
        }
        Self::resolve(file, &env, overrides)
    }

    /// Combine already-loaded sources. `env` is the env file overlaid with the
    /// process environment.
    pub fn resolve(
        file: FileConfig,
        env: &HashMap<String, String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let lookup = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let api_key = lookup(API_KEY_VAR)
            .ok_or_else(|| Error::Config(format!("{} is not set", API_KEY_VAR)))?;

        let mut llm = LlmConfig::new(api_key);
        if let Some(base) = lookup(API_BASE_VAR).or(file.llm.api_base.as_deref()) {
            llm = llm.api_base(base);
        }
        let model = overrides
            .model
            .as_deref()
            .or(lookup(MODEL_VAR))
            .or(file.llm.model.as_deref());
        if let Some(model) = model {
            llm = llm.model(model);
        }
        if let Some(temperature) = file.llm.temperature {
            llm.temperature = temperature;
        }
        if let Some(max_tokens) = file.llm.max_tokens {
            llm.max_tokens = max_tokens;
        }
        if let Some(secs) = file.llm.timeout_secs {
            llm.timeout = Duration::from_secs(secs);
        }

        let agent = AgentSettings {
            max_steps: overrides.max_steps.unwrap_or(file.agent.max_steps),
            max_actions_per_step: file.agent.max_actions_per_step,
            max_failures: file.agent.max_failures,
            use_vision: file.agent.use_vision && !overrides.no_vision,
            memory_len: file.agent.memory_len,
            browser: BrowserConfig {
                headless: file.browser.headless || overrides.headless,
                proxy: file.browser.proxy,
                user_agent: file.browser.user_agent,
                viewport_width: file.browser.viewport_width,
                viewport_height: file.browser.viewport_height,
                viewport_only: file.browser.viewport_only,
            },
        };
        if agent.max_steps == 0 {
            return Err(Error::Config("max_steps must be at least 1".into()));
        }
        if agent.max_actions_per_step == 0 {
            return Err(Error::Config("max_actions_per_step must be at least 1".into()));
        }
        if agent.max_failures == 0 {
            return Err(Error::Config("max_failures must be at least 1".into()));
        }

        let output = overrides
            .output_dir
            .clone()
            .or(file.output.dir)
            .map(OutputPaths::new)
            .unwrap_or_default();

        let timeout = overrides
            .timeout_secs
            .or(file.agent.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            llm,
            agent,
            output,
            timeout,
        })
    }
}

/// `KEY=VALUE` pairs from a dotenv file. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            tracing::debug!("No env file at {}", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => return Err(Error::Config(format!("{}: {}", path.display(), e))),
    };
    iter.map(|item| item.map_err(|e| Error::Config(format!("{}: {}", path.display(), e))))
        .collect()
}
