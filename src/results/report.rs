//! Report generation for test results
//!
//! Writes the self-contained HTML report and the JSON results file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{RunSummary, StepOutcome, TestResult, TestStatus};

pub const HTML_FILE: &str = "index.html";

/// Writes run reports to their configured locations
pub struct ReportGenerator {
    html_dir: PathBuf,
    json_file: PathBuf,
}

impl ReportGenerator {
    pub fn new(html_dir: impl Into<PathBuf>, json_file: impl Into<PathBuf>) -> Self {
        Self {
            html_dir: html_dir.into(),
            json_file: json_file.into(),
        }
    }

    /// Write every report; returns the written paths
    pub fn write_all(&self, summary: &RunSummary) -> Result<Vec<PathBuf>> {
        Ok(vec![self.write_html(summary)?, self.write_json(summary)?])
    }

    pub fn write_html(&self, summary: &RunSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.html_dir).with_context(|| {
            format!("Failed to create report dir {}", self.html_dir.display())
        })?;
        let path = self.html_dir.join(HTML_FILE);
        fs::write(&path, format_html_report(summary)).context("Failed to write HTML report")?;
        info!("Saved HTML report to {}", path.display());
        Ok(path)
    }

    pub fn write_json(&self, summary: &RunSummary) -> Result<PathBuf> {
        if let Some(parent) = self.json_file.parent() {
            fs::create_dir_all(parent).context("Failed to create results dir")?;
        }
        let file = File::create(&self.json_file).context("Failed to create results file")?;
        serde_json::to_writer_pretty(BufWriter::new(file), summary)
            .context("Failed to write results")?;
        info!("Saved test results to {}", self.json_file.display());
        Ok(self.json_file.clone())
    }
}

fn status_class(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "pass",
        TestStatus::Fail => "fail",
        TestStatus::Skip => "skip",
        TestStatus::Flaky => "flaky",
    }
}

fn step_class(outcome: &StepOutcome) -> &'static str {
    match outcome {
        StepOutcome::Passed => "pass",
        StepOutcome::Failed(_) => "fail",
        StepOutcome::NotApplicable(_) => "skip",
    }
}

pub fn format_html_report(summary: &RunSummary) -> String {
    let mut output = String::new();
    let projects: Vec<&str> = summary.projects.iter().map(|p| p.name()).collect();

    let _ = writeln!(
        output,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>DefectDojo Test Report - {}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        h2 {{ color: #555; margin-top: 30px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid #ddd; vertical-align: top; }}
        th {{ background: #007bff; color: white; }}
        ul.steps {{ margin: 6px 0 0 0; padding-left: 18px; font-size: 13px; color: #555; }}
        .pass {{ color: #28a745; font-weight: bold; }}
        .fail {{ color: #dc3545; font-weight: bold; }}
        .skip {{ color: #6c757d; font-weight: bold; }}
        .flaky {{ color: #fd7e14; font-weight: bold; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 120px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
        .stat-label {{ color: #666; font-size: 14px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>DefectDojo Test Report</h1>
        <p>Projects: {} &middot; Target: {} &middot; Started: {}</p>"#,
        escape(&summary.base_url),
        projects.join(", "),
        escape(&summary.base_url),
        format_datetime(&summary.started_at)
    );

    for (label, value) in [
        ("Total", summary.total.to_string()),
        ("Passed", summary.passed.to_string()),
        ("Failed", summary.failed.to_string()),
        ("Skipped", summary.skipped.to_string()),
        ("Flaky", summary.flaky.to_string()),
        ("Pass Rate", format!("{:.1}%", summary.pass_rate())),
        ("Duration", format!("{}ms", summary.total_duration_ms)),
    ] {
        let _ = writeln!(
            output,
            r#"        <div class="stat-card"><div class="stat-value">{value}</div><div class="stat-label">{label}</div></div>"#
        );
    }

    let _ = writeln!(
        output,
        r#"
        <h2>Results</h2>
        <table>
            <tr><th>Status</th><th>Test</th><th>Attempts</th><th>Duration</th><th>Details</th></tr>"#
    );

    for result in &summary.results {
        output.push_str(&format_result_row(result));
    }

    let _ = writeln!(
        output,
        r#"        </table>
    </div>
</body>
</html>"#
    );
    output
}

fn format_result_row(result: &TestResult) -> String {
    let mut row = String::new();
    let _ = write!(
        row,
        r#"            <tr><td class="{}">{}</td><td>{}</td><td>{}</td><td>{}ms</td><td>"#,
        status_class(result.status),
        result.status,
        escape(&result.title),
        result.attempts,
        result.duration_ms
    );

    if let Some(message) = &result.message {
        let _ = write!(row, "{}", escape(message));
    }

    if !result.steps.is_empty() {
        row.push_str(r#"<ul class="steps">"#);
        for step in &result.steps {
            let _ = write!(
                row,
                r#"<li class="{}">{}</li>"#,
                step_class(&step.outcome),
                escape(&step.to_string())
            );
        }
        row.push_str("</ul>");
    }

    for artifact in &result.artifacts {
        let _ = write!(
            row,
            r#"<div><a href="{0}">{0}</a></div>"#,
            escape(&artifact_href(artifact))
        );
    }

    row.push_str("</td></tr>\n");
    row
}

fn artifact_href(path: &Path) -> String {
    match path.canonicalize() {
        Ok(abs) => format!("file://{}", abs.display()),
        Err(_) => path.display().to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
