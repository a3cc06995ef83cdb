//! Test execution runner
//!
//! Runs one test case: requirement gating, a fresh browser session per
//! attempt, the per-test timeout, retries, and artifact capture.

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::config::{RunnerConfig, TestEnv};
use crate::fixtures::FixtureLoader;
use crate::http::DojoApi;
use crate::models::{Driver, StepRecord, Suite, TestCase, TestResult};
use crate::results::{ArtifactStore, AttemptTrace};
use crate::suites::{self, TestContext};
use crate::utils::timer::Timer;

/// What one attempt produced
struct Attempt {
    error: Option<String>,
    steps: Vec<StepRecord>,
    artifacts: Vec<PathBuf>,
}

/// Runs DefectDojo test cases against one deployment
pub struct TestRunner {
    env: Arc<TestEnv>,
    config: Arc<RunnerConfig>,
    api: DojoApi,
    fixtures: FixtureLoader,
    artifacts: ArtifactStore,
}

impl TestRunner {
    pub fn new(env: Arc<TestEnv>, config: Arc<RunnerConfig>) -> Result<Self> {
        let api = DojoApi::new(&env, config.timeout_secs)?;
        let fixtures = FixtureLoader::new(&config.fixtures_dir);
        let artifacts = ArtifactStore::new(&config.artifacts_dir);
        Ok(Self {
            env,
            config,
            api,
            fixtures,
            artifacts,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a single test case, retrying failed attempts
    pub async fn run_test(&self, test_case: TestCase) -> TestResult {
        if let Some(reason) = self.env.unmet(test_case.requirements()) {
            info!("Skipping {}: {}", test_case.title(), reason);
            return TestResult::skip(test_case, reason);
        }

        info!("Running {}", test_case.title());
        let timer = Timer::start(test_case.slug());
        let mut artifacts = Vec::new();
        let max_attempts = self.config.retries + 1;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                warn!("Retrying {} (retry #{})", test_case.title(), attempt);
            }

            let outcome = self.run_attempt(test_case, attempt).await;
            artifacts.extend(outcome.artifacts);

            match outcome.error {
                None => {
                    let result = TestResult::pass(test_case, timer.elapsed_ms())
                        .with_attempts(attempt + 1)
                        .with_steps(outcome.steps)
                        .with_artifacts(artifacts);
                    info!("  {}", result);
                    timer.stop();
                    return result;
                }
                Some(message) if attempt + 1 == max_attempts => {
                    let result = TestResult::fail(test_case, timer.elapsed_ms(), message)
                        .with_attempts(max_attempts)
                        .with_steps(outcome.steps)
                        .with_artifacts(artifacts);
                    warn!("  {}", result);
                    timer.stop();
                    return result;
                }
                Some(message) => {
                    warn!("{} failed: {}", test_case.title(), message);
                }
            }
        }

        // Only reachable with zero attempts, which `retries + 1` rules out
        TestResult::fail(test_case, timer.elapsed_ms(), "No attempts made")
    }

    async fn run_attempt(&self, test_case: TestCase, attempt: u32) -> Attempt {
        let started_at = Utc::now();
        let mut ctx = TestContext::new(self.env.clone(), self.api.clone(), self.fixtures.clone());
        let mut error = None;
        // Browser start and the case body share one budget
        let deadline = Instant::now() + Duration::from_secs(self.config.timeout_secs);

        if test_case.driver() == Driver::Browser {
            match timeout_at(deadline, self.start_browser()).await {
                Ok(Ok(session)) => ctx = ctx.with_browser(session),
                Ok(Err(e)) => error = Some(format!("{e:#}")),
                Err(_) => error = Some(self.timeout_message()),
            }
        }

        if error.is_none() {
            error = match timeout_at(deadline, suites::run_case(test_case, &ctx)).await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{e:#}")),
                Err(_) => Some(self.timeout_message()),
            };
        }

        let steps = ctx.steps();
        let mut artifacts = Vec::new();

        if let Some(session) = ctx.take_browser() {
            // Teardown may run past an exhausted budget by one expect timeout
            let teardown = deadline
                .max(Instant::now() + Duration::from_secs(self.config.expect_timeout_secs));
            if self.config.screenshot.applies_to(error.is_some()) {
                match timeout_at(teardown, session.screenshot()).await {
                    Ok(Ok(png)) => match self.artifacts.save_screenshot(test_case, attempt, &png) {
                        Ok(path) => artifacts.push(path),
                        Err(e) => warn!("Failed to save screenshot: {:#}", e),
                    },
                    Ok(Err(e)) => warn!("Failed to capture screenshot: {}", e),
                    Err(_) => warn!("Screenshot of {} timed out", test_case.title()),
                }
            }
            match timeout_at(teardown, session.quit()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to close browser session: {}", e),
                Err(_) => warn!("Closing browser session for {} timed out", test_case.title()),
            }
        }

        if self.config.trace.applies_to(attempt) {
            let trace = AttemptTrace {
                test_case,
                title: test_case.title(),
                attempt,
                started_at,
                finished_at: Utc::now(),
                error: error.clone(),
                steps: steps.clone(),
            };
            match self.artifacts.save_trace(&trace) {
                Ok(path) => artifacts.push(path),
                Err(e) => warn!("Failed to save trace: {:#}", e),
            }
        }

        Attempt {
            error,
            steps,
            artifacts,
        }
    }

    fn timeout_message(&self) -> String {
        format!("Test timeout of {}s exceeded", self.config.timeout_secs)
    }

    async fn start_browser(&self) -> Result<BrowserSession> {
        let session = BrowserSession::start(
            &self.config.webdriver_url,
            &self.config.browser,
            self.env.base_url(),
            Duration::from_secs(self.config.expect_timeout_secs),
        )
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to start browser session at {}: {}",
                self.config.webdriver_url,
                e
            )
        })?;
        Ok(session)
    }
}

/// Cases of the given suites whose title matches every filter
pub fn select_cases(suites: &[Suite], filters: &[&Regex]) -> Vec<TestCase> {
    let mut cases: Vec<TestCase> = suites
        .iter()
        .flat_map(|suite| TestCase::for_suite(*suite))
        .collect();
    cases.sort();
    cases.dedup();

    cases
        .into_iter()
        .filter(|case| {
            let title = case.title();
            filters.iter().all(|f| f.is_match(&title))
        })
        .collect()
}
