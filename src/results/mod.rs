//! Results reporting module
//!
//! HTML and JSON reports for a run, plus per-attempt artifacts.

mod artifacts;
mod report;

pub use artifacts::{ArtifactStore, AttemptTrace};
pub use report::ReportGenerator;
