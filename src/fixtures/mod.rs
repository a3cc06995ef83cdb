//! Scan-import fixtures
//!
//! Loads sample scan-result files from the fixtures directory and turns them
//! into multipart import requests.

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::http::{FilePart, MultipartForm};

/// Product every import targets
pub const TEST_PRODUCT_NAME: &str = "test/e2e-validation";
pub const TEST_PRODUCT_TYPE: &str = "Web Application";
pub const TEST_ENGAGEMENT: &str = "E2E Test Import";

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw fixture bytes
#[derive(Clone, Debug)]
pub struct Fixture {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Reads fixtures from a fixed directory
#[derive(Clone, Debug)]
pub struct FixtureLoader {
    dir: PathBuf,
}

impl FixtureLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, name: &str) -> Result<Fixture, FixtureError> {
        let path = self.dir.join(name);
        let bytes = std::fs::read(&path).map_err(|source| FixtureError::Read {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded fixture {} ({} bytes)", path.display(), bytes.len());
        Ok(Fixture {
            name: name.to_string(),
            bytes,
        })
    }
}

/// Scanner report formats the suites import
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanType {
    Semgrep,
    Trivy,
}

impl ScanType {
    /// DefectDojo parser name
    pub fn label(&self) -> &'static str {
        match self {
            ScanType::Semgrep => "Semgrep JSON Report",
            ScanType::Trivy => "Trivy Scan",
        }
    }

    pub fn fixture_name(&self) -> &'static str {
        match self {
            ScanType::Semgrep => "semgrep-sample.json",
            ScanType::Trivy => "trivy-sample.json",
        }
    }

    /// File name presented in the upload
    pub fn upload_name(&self) -> &'static str {
        match self {
            ScanType::Semgrep => "semgrep-results.json",
            ScanType::Trivy => "trivy-results.json",
        }
    }
}

/// Parameters of a single import-scan call
#[derive(Clone, Debug)]
pub struct ScanImport {
    pub scan_type: ScanType,
    pub product_name: String,
    pub product_type_name: String,
    pub engagement_name: String,
    pub auto_create_context: bool,
    pub verified: bool,
    pub active: bool,
}

impl ScanImport {
    pub fn new(scan_type: ScanType) -> Self {
        Self {
            scan_type,
            product_name: TEST_PRODUCT_NAME.to_string(),
            product_type_name: TEST_PRODUCT_TYPE.to_string(),
            engagement_name: TEST_ENGAGEMENT.to_string(),
            auto_create_context: true,
            verified: false,
            active: true,
        }
    }

    /// Multipart body with the fixture as the `file` part
    pub fn into_form(self, fixture: Fixture) -> MultipartForm {
        MultipartForm::new()
            .text("scan_type", self.scan_type.label())
            .text("product_name", self.product_name)
            .text("product_type_name", self.product_type_name)
            .text("engagement_name", self.engagement_name)
            .text("auto_create_context", self.auto_create_context.to_string())
            .text("verified", self.verified.to_string())
            .text("active", self.active.to_string())
            .file(
                "file",
                FilePart {
                    file_name: self.scan_type.upload_name().to_string(),
                    mime_type: "application/json".to_string(),
                    bytes: fixture.bytes,
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_fixture() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("trivy-sample.json"), b"{\"Results\": []}").unwrap();

        let loader = FixtureLoader::new(dir.path());
        let fixture = loader.load(ScanType::Trivy.fixture_name()).unwrap();
        assert_eq!(fixture.bytes, b"{\"Results\": []}");

        let err = loader.load("missing.json").unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_form_fields() {
        let fixture = Fixture {
            name: "semgrep-sample.json".to_string(),
            bytes: b"{}".to_vec(),
        };
        let form = ScanImport::new(ScanType::Semgrep).into_form(fixture);

        assert_eq!(form.field("scan_type"), Some("Semgrep JSON Report"));
        assert_eq!(form.field("product_name"), Some("test/e2e-validation"));
        assert_eq!(form.field("product_type_name"), Some("Web Application"));
        assert_eq!(form.field("engagement_name"), Some("E2E Test Import"));
        assert_eq!(form.field("auto_create_context"), Some("true"));
        assert_eq!(form.field("verified"), Some("false"));
        assert_eq!(form.field("active"), Some("true"));
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].0, "file");
        assert_eq!(form.files[0].1.file_name, "semgrep-results.json");
    }

    #[test]
    fn test_shipped_fixtures_are_json() {
        let loader = FixtureLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"));
        for scan in [ScanType::Semgrep, ScanType::Trivy] {
            let fixture = loader.load(scan.fixture_name()).unwrap();
            assert!(serde_json::from_slice::<serde_json::Value>(&fixture.bytes).is_ok());
        }
    }
}
