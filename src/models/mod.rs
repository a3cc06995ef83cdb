//! Data models for the test harness
//!
//! Test case registry, suites, and result types.

mod test_case;
mod test_result;

pub use test_case::{Driver, Suite, TestCase};
pub use test_result::{RunSummary, StepOutcome, StepRecord, TestResult, TestStatus};
