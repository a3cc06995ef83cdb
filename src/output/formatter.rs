//! Output formatters for test results
//!
//! Console reporters: a line per case (`list`), JSON, and a one-line summary.

use crate::models::{RunSummary, StepOutcome, TestResult, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    List,
    Json,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "list" | "line" => Some(OutputFormat::List),
            "json" => Some(OutputFormat::Json),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_label(&self, status: TestStatus) -> &'static str {
        if self.colorize {
            match status {
                TestStatus::Pass => "\x1b[32m✓ PASS \x1b[0m",
                TestStatus::Fail => "\x1b[31m✗ FAIL \x1b[0m",
                TestStatus::Skip => "\x1b[33m○ SKIP \x1b[0m",
                TestStatus::Flaky => "\x1b[35m~ FLAKY\x1b[0m",
            }
        } else {
            match status {
                TestStatus::Pass => "✓ PASS ",
                TestStatus::Fail => "✗ FAIL ",
                TestStatus::Skip => "○ SKIP ",
                TestStatus::Flaky => "~ FLAKY",
            }
        }
    }

    fn format_result_line(&self, result: &TestResult) -> String {
        let mut line = format!(
            "  {} {} [{}ms]",
            self.status_label(result.status),
            result.title,
            result.duration_ms
        );
        if result.attempts > 1 {
            line.push_str(&format!(" (attempts: {})", result.attempts));
        }

        match result.status {
            TestStatus::Skip => {
                if let Some(reason) = &result.message {
                    line.push_str(&format!("\n      {reason}"));
                }
            }
            TestStatus::Fail => {
                if let Some(message) = &result.message {
                    line.push_str(&format!("\n      {message}"));
                }
                for step in &result.steps {
                    let marker = if step.outcome.is_failed() { ">" } else { " " };
                    line.push_str(&format!("\n      {marker} {step}"));
                }
                for artifact in &result.artifacts {
                    line.push_str(&format!("\n      artifact: {}", artifact.display()));
                }
            }
            TestStatus::Pass | TestStatus::Flaky if result.not_applicable_steps() > 0 => {
                let not_applicable: Vec<&str> = result
                    .steps
                    .iter()
                    .filter(|s| matches!(s.outcome, StepOutcome::NotApplicable(_)))
                    .map(|s| s.name.as_str())
                    .collect();
                line.push_str(&format!(
                    "\n      not applicable: {}",
                    not_applicable.join(", ")
                ));
            }
            TestStatus::Pass | TestStatus::Flaky => {}
        }
        line
    }

    /// Format a whole run
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::List => self.format_summary_list(summary),
            OutputFormat::Json => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_list(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        let mut group = "";

        for result in &summary.results {
            if result.test_case.group() != group {
                group = result.test_case.group();
                output.push_str(&format!(
                    "\n{} > {}\n",
                    result.test_case.suite(),
                    group
                ));
            }
            output.push_str(&self.format_result_line(result));
            output.push('\n');
        }

        let failed = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {} | Flaky: {}\n",
            summary.total, summary.passed, failed, summary.skipped, summary.flaky
        ));
        output.push_str(&format!(
            " Pass Rate: {:.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        let projects: Vec<&str> = summary.projects.iter().map(|p| p.name()).collect();
        format!(
            "[{}] {}: {}/{} passed, {} failed, {} skipped, {} flaky ({:.1}%) in {}ms",
            projects.join(", "),
            summary.base_url,
            summary.passed + summary.flaky,
            summary.total,
            summary.failed,
            summary.skipped,
            summary.flaky,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::List)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepRecord, Suite, TestCase};
    use chrono::Utc;

    fn summary() -> RunSummary {
        RunSummary::new(
            vec![Suite::Smoke],
            "http://localhost:8080",
            Utc::now(),
            vec![
                TestResult::pass(TestCase::RejectWithoutToken, 12).with_attempts(2),
                TestResult::skip(
                    TestCase::AcceptValidToken,
                    "DEFECTDOJO_TOKEN environment variable not set",
                ),
                TestResult::fail(
                    TestCase::ResponseTime,
                    5100,
                    "Assertion failed: took 5100ms, limit is 5000ms",
                ),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("LIST"), Some(OutputFormat::List));
        assert_eq!(OutputFormat::from_str("table"), None);
    }

    #[test]
    fn test_list_groups_and_footer() {
        let output = ResultFormatter::new(OutputFormat::List)
            .no_color()
            .format_summary(&summary());

        assert!(output.contains("smoke > Authentication Smoke Tests"));
        assert!(output.contains("smoke > Health Checks"));
        assert!(output.contains("~ FLAKY smoke > Authentication Smoke Tests > should reject requests without token"));
        assert!(output.contains("DEFECTDOJO_TOKEN environment variable not set"));
        assert!(output.contains("Total: 3 | Pass: 0 | Fail: 1 | Skip: 1 | Flaky: 1"));
    }

    #[test]
    fn test_not_applicable_steps_are_listed() {
        let result = TestResult::pass(TestCase::SearchFindings, 800).with_steps(vec![StepRecord {
            name: "title search present".to_string(),
            outcome: StepOutcome::NotApplicable("no visible input".to_string()),
            duration_ms: 20,
        }]);
        let line = ResultFormatter::new(OutputFormat::List)
            .no_color()
            .format_result_line(&result);
        assert!(line.contains("not applicable: title search present"));
    }

    #[test]
    fn test_brief_summary() {
        let line = ResultFormatter::new(OutputFormat::Summary).format_summary(&summary());
        assert!(line.starts_with("[smoke] http://localhost:8080: 1/3 passed, 1 failed"));
    }
}
