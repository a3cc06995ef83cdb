//! Test result models
//!
//! Outcomes for individual steps, test cases, and whole runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::{Suite, TestCase};

/// Final status of a test case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    /// Passed only after at least one retry
    Flaky,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Skip => "○",
            TestStatus::Flaky => "~",
        }
    }

    /// Whether the status keeps the run green
    pub fn is_success(&self) -> bool {
        !matches!(self, TestStatus::Fail)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Skip => write!(f, "SKIP"),
            TestStatus::Flaky => write!(f, "FLAKY"),
        }
    }
}

/// Outcome of a single step inside a test case
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The element or feature the step depends on is absent in this build
    NotApplicable(String),
    Passed,
    Failed(String),
}

impl StepOutcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            StepOutcome::NotApplicable(_) => "-",
            StepOutcome::Passed => "✓",
            StepOutcome::Failed(_) => "✗",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Recorded step with timing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}ms]", self.outcome.symbol(), self.name, self.duration_ms)?;
        match &self.outcome {
            StepOutcome::NotApplicable(reason) => write!(f, " (n/a: {reason})"),
            StepOutcome::Failed(reason) => write!(f, " - {reason}"),
            StepOutcome::Passed => Ok(()),
        }
    }
}

/// Result of a single test case, after retries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case: TestCase,
    pub title: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    /// Number of attempts made (0 when skipped)
    pub attempts: u32,
    pub message: Option<String>,
    /// Steps of the final attempt
    pub steps: Vec<StepRecord>,
    pub artifacts: Vec<PathBuf>,
}

impl TestResult {
    fn new(test_case: TestCase, status: TestStatus) -> Self {
        Self {
            test_case,
            title: test_case.title(),
            status,
            duration_ms: 0,
            attempts: 0,
            message: None,
            steps: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn pass(test_case: TestCase, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            attempts: 1,
            ..Self::new(test_case, TestStatus::Pass)
        }
    }

    pub fn fail(test_case: TestCase, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            duration_ms,
            attempts: 1,
            message: Some(message.into()),
            ..Self::new(test_case, TestStatus::Fail)
        }
    }

    pub fn skip(test_case: TestCase, reason: impl Into<String>) -> Self {
        Self {
            message: Some(reason.into()),
            ..Self::new(test_case, TestStatus::Skip)
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        if attempts > 1 && self.status == TestStatus::Pass {
            self.status = TestStatus::Flaky;
        }
        self
    }

    pub fn with_steps(mut self, steps: Vec<StepRecord>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Steps whose feature was absent in the target build
    pub fn not_applicable_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::NotApplicable(_)))
            .count()
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.test_case,
            self.duration_ms
        )?;
        if self.attempts > 1 {
            write!(f, " (attempts: {})", self.attempts)?;
        }
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of a complete run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub projects: Vec<Suite>,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub flaky: usize,
    pub total_duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl RunSummary {
    pub fn new(
        projects: Vec<Suite>,
        base_url: impl Into<String>,
        started_at: DateTime<Utc>,
        results: Vec<TestResult>,
    ) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        let completed_at = Utc::now();

        Self {
            projects,
            base_url: base_url.into(),
            started_at,
            completed_at,
            total: results.len(),
            passed: count(TestStatus::Pass),
            failed: count(TestStatus::Fail),
            skipped: count(TestStatus::Skip),
            flaky: count(TestStatus::Flaky),
            total_duration_ms: (completed_at - started_at).num_milliseconds().max(0) as u64,
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        let executed = self.total - self.skipped;
        if executed == 0 {
            0.0
        } else {
            ((self.passed + self.flaky) as f64 / executed as f64) * 100.0
        }
    }

    /// True when nothing failed; drives the process exit code
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.status.is_success())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let projects: Vec<_> = self.projects.iter().map(|p| p.name()).collect();
        writeln!(f, "Run [{}] against {}", projects.join(", "), self.base_url)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Flaky: {}",
            self.total, self.passed, self.failed, self.skipped, self.flaky
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_creation() {
        let result = TestResult::pass(TestCase::ApiRoot, 100);
        assert!(result.status.is_success());
        assert_eq!(result.duration_ms, 100);
        assert_eq!(result.title, "e2e > API Endpoints > should return API root");
    }

    #[test]
    fn test_pass_after_retry_is_flaky() {
        let result = TestResult::pass(TestCase::ApiRoot, 10).with_attempts(2);
        assert_eq!(result.status, TestStatus::Flaky);
        assert!(result.status.is_success());

        let failed = TestResult::fail(TestCase::ApiRoot, 10, "boom").with_attempts(3);
        assert_eq!(failed.status, TestStatus::Fail);
    }

    #[test]
    fn test_step_outcomes() {
        let steps = vec![
            StepRecord {
                name: "open filter".to_string(),
                outcome: StepOutcome::NotApplicable("element not visible".to_string()),
                duration_ms: 3,
            },
            StepRecord {
                name: "goto /finding".to_string(),
                outcome: StepOutcome::Passed,
                duration_ms: 20,
            },
        ];
        let result = TestResult::pass(TestCase::SearchFindings, 23).with_steps(steps);
        assert_eq!(result.not_applicable_steps(), 1);
        assert!(result.steps[0].to_string().contains("n/a"));
    }

    #[test]
    fn test_step_outcome_serialization() {
        let json = serde_json::to_value(StepOutcome::Failed("no table".into())).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "no table");
    }

    #[test]
    fn test_run_summary() {
        let results = vec![
            TestResult::pass(TestCase::ApiRoot, 100),
            TestResult::fail(TestCase::RejectUnauthenticated, 50, "expected 401, got 200"),
            TestResult::skip(TestCase::ProductsWithToken, "no token"),
            TestResult::pass(TestCase::ResponseTime, 10).with_attempts(2),
        ];

        let summary = RunSummary::new(vec![Suite::E2e], "http://localhost:8080", Utc::now(), results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.flaky, 1);
        assert!(!summary.is_success());
        assert!((summary.pass_rate() - 66.666).abs() < 0.1);
    }
}
