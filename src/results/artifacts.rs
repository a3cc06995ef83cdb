//! Per-attempt artifacts
//!
//! Screenshots and step traces land in
//! `<artifacts_dir>/<case-slug>[-retryN]/`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::debug;

use crate::models::{StepRecord, TestCase};

pub const SCREENSHOT_FILE: &str = "screenshot.png";
pub const TRACE_FILE: &str = "trace.json";

/// Step-level record of one attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttemptTrace {
    pub test_case: TestCase,
    pub title: String,
    /// 0 for the first run, N for the Nth retry
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
}

/// Writes artifacts under a fixed root
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory for one attempt of a case
    pub fn attempt_dir(&self, test_case: TestCase, attempt: u32) -> PathBuf {
        let slug = test_case.slug();
        if attempt == 0 {
            self.root.join(slug)
        } else {
            self.root.join(format!("{slug}-retry{attempt}"))
        }
    }

    fn create(&self, test_case: TestCase, attempt: u32, file: &str) -> Result<PathBuf> {
        let dir = self.attempt_dir(test_case, attempt);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create artifact dir {}", dir.display()))?;
        Ok(dir.join(file))
    }

    pub fn save_screenshot(&self, test_case: TestCase, attempt: u32, png: &[u8]) -> Result<PathBuf> {
        let path = self.create(test_case, attempt, SCREENSHOT_FILE)?;
        fs::write(&path, png).context("Failed to write screenshot")?;
        debug!("Saved screenshot to {}", path.display());
        Ok(path)
    }

    pub fn save_trace(&self, trace: &AttemptTrace) -> Result<PathBuf> {
        let path = self.create(trace.test_case, trace.attempt, TRACE_FILE)?;
        let file = File::create(&path).context("Failed to create trace file")?;
        serde_json::to_writer_pretty(BufWriter::new(file), trace)
            .context("Failed to write trace")?;
        debug!("Saved trace to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepOutcome;
    use tempfile::TempDir;

    #[test]
    fn test_attempt_dirs() {
        let store = ArtifactStore::new("test-results/artifacts");
        assert_eq!(
            store.attempt_dir(TestCase::Logout, 0),
            PathBuf::from("test-results/artifacts/e2e-login-flow-should-be-able-to-logout")
        );
        assert_eq!(
            store.attempt_dir(TestCase::Logout, 1),
            PathBuf::from("test-results/artifacts/e2e-login-flow-should-be-able-to-logout-retry1")
        );
    }

    #[test]
    fn test_save_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let png = store
            .save_screenshot(TestCase::ProductsList, 0, b"\x89PNG")
            .unwrap();
        assert!(png.ends_with("screenshot.png"));
        assert_eq!(fs::read(&png).unwrap(), b"\x89PNG");

        let trace = AttemptTrace {
            test_case: TestCase::ProductsList,
            title: TestCase::ProductsList.title(),
            attempt: 1,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            error: Some("Assertion failed: expected table to be visible".to_string()),
            steps: vec![StepRecord {
                name: "open products".to_string(),
                outcome: StepOutcome::Passed,
                duration_ms: 40,
            }],
        };
        let path = store.save_trace(&trace).unwrap();
        assert!(path.parent().unwrap().ends_with(format!(
            "{}-retry1",
            TestCase::ProductsList.slug()
        )));

        let loaded: AttemptTrace =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.attempt, 1);
    }
}
