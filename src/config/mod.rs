//! Configuration module
//!
//! Runner settings (timeouts, retries, reporters, projects) and the
//! environment resolver.

pub mod env;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Suite;
pub use env::{Requirement, TestEnv};

/// Runner configuration errors; any of these aborts the whole run
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Fixtures directory {0} is not readable: {1}")]
    FixturesUnreadable(PathBuf, String),

    #[error("--only is not allowed when CI is set")]
    ForbidOnly,

    #[error("Unknown project: {0}")]
    UnknownProject(String),
}

/// When to keep a step trace for a test attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceMode {
    Off,
    On,
    OnFirstRetry,
}

impl TraceMode {
    /// Whether the attempt with the given index (0 = first run) is traced
    pub fn applies_to(&self, attempt: u32) -> bool {
        match self {
            TraceMode::Off => false,
            TraceMode::On => true,
            TraceMode::OnFirstRetry => attempt == 1,
        }
    }
}

/// When to capture a browser screenshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenshotMode {
    Off,
    On,
    OnlyOnFailure,
}

impl ScreenshotMode {
    pub fn applies_to(&self, failed: bool) -> bool {
        match self {
            ScreenshotMode::Off => false,
            ScreenshotMode::On => true,
            ScreenshotMode::OnlyOnFailure => failed,
        }
    }
}

/// Browser session settings ("Desktop Chrome" profile by default)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser_name: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub accept_insecure_certs: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser_name: "chrome".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            accept_insecure_certs: true,
        }
    }
}

/// A named suite selection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub suite: Suite,
}

/// Test runner configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Root of all run output
    pub output_dir: PathBuf,

    /// HTML report directory
    pub html_dir: PathBuf,

    /// JSON result file
    pub json_file: PathBuf,

    /// Per-test artifacts (screenshots, traces)
    pub artifacts_dir: PathBuf,

    /// Scan-result fixtures
    pub fixtures_dir: PathBuf,

    /// Per-test timeout in seconds
    pub timeout_secs: u64,

    /// Per-assertion timeout in seconds
    pub expect_timeout_secs: u64,

    /// Re-runs of a failed test case
    pub retries: u32,

    /// Maximum concurrently running test cases
    pub workers: Option<usize>,

    pub fully_parallel: bool,

    pub forbid_only: bool,

    pub trace: TraceMode,

    pub screenshot: ScreenshotMode,

    /// WebDriver endpoint for browser tests
    pub webdriver_url: String,

    pub browser: BrowserConfig,

    pub projects: Vec<ProjectConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let output_dir = PathBuf::from("test-results");
        Self {
            html_dir: output_dir.join("html"),
            json_file: output_dir.join("results.json"),
            artifacts_dir: output_dir.join("artifacts"),
            output_dir,
            fixtures_dir: PathBuf::from("fixtures"),
            timeout_secs: 60,
            expect_timeout_secs: 10,
            retries: 0,
            workers: None,
            fully_parallel: true,
            forbid_only: false,
            trace: TraceMode::OnFirstRetry,
            screenshot: ScreenshotMode::OnlyOnFailure,
            webdriver_url: "http://localhost:4444".to_string(),
            browser: BrowserConfig::default(),
            projects: Suite::all()
                .into_iter()
                .map(|suite| ProjectConfig {
                    name: suite.name().to_string(),
                    suite,
                })
                .collect(),
        }
    }
}

impl RunnerConfig {
    /// Default configuration with the CI policy applied
    pub fn for_env(env: &TestEnv) -> Self {
        Self::default().apply_env(env)
    }

    /// Apply CI policy and environment overrides
    pub fn apply_env(mut self, env: &TestEnv) -> Self {
        if env.is_ci() {
            self.retries = 2;
            self.workers = Some(1);
            self.forbid_only = true;
        }
        if let Some(url) = env.webdriver_url() {
            self.webdriver_url = url.to_string();
        }
        self
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_yaml(path.as_ref()) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Move every output path under a new root
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.html_dir = dir.join("html");
        self.json_file = dir.join("results.json");
        self.artifacts_dir = dir.join("artifacts");
        self.output_dir = dir;
        self
    }

    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() / 2)
                .unwrap_or(1)
        })
        .max(1)
    }

    /// Find a project by name
    pub fn project(&self, name: &str) -> Result<&ProjectConfig, ConfigError> {
        self.projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownProject(name.to_string()))
    }

    /// Reject configurations that must abort the run
    pub fn validate(&self, focused: bool) -> Result<(), ConfigError> {
        if focused && self.forbid_only {
            return Err(ConfigError::ForbidOnly);
        }

        std::fs::read_dir(&self.fixtures_dir).map_err(|e| {
            ConfigError::FixturesUnreadable(self.fixtures_dir.clone(), e.to_string())
        })?;

        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
