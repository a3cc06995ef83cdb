//! Parallel test execution
//!
//! Schedules test cases onto a bounded pool of workers.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::runner::TestRunner;
use crate::models::{TestCase, TestResult};
use crate::utils::timer::Timer;

/// Parallel test executor
pub struct ParallelExecutor {
    runner: Arc<TestRunner>,
    max_concurrent: usize,
    fully_parallel: bool,
}

impl ParallelExecutor {
    pub fn new(runner: Arc<TestRunner>) -> Self {
        let max_concurrent = runner.config().worker_count();
        let fully_parallel = runner.config().fully_parallel;
        Self {
            runner,
            max_concurrent,
            fully_parallel,
        }
    }

    /// Scheduling units: one per case, or one per group when groups run
    /// their cases in order
    fn units(&self, test_cases: Vec<TestCase>) -> Vec<Vec<TestCase>> {
        if self.fully_parallel {
            return test_cases.into_iter().map(|case| vec![case]).collect();
        }

        let mut units: Vec<Vec<TestCase>> = Vec::new();
        for case in test_cases {
            match units.iter_mut().find(|u| u[0].group() == case.group()) {
                Some(unit) => unit.push(case),
                None => units.push(vec![case]),
            }
        }
        units
    }

    /// Run test cases concurrently; results come back in registry order
    pub async fn run(&self, test_cases: Vec<TestCase>) -> Vec<TestResult> {
        let count = test_cases.len();
        info!(
            "Running {} tests with {} workers",
            count, self.max_concurrent
        );

        let timer = Timer::start("run");
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::new();

        for unit in self.units(test_cases) {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            let cases = unit.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let mut results = Vec::with_capacity(unit.len());
                for test_case in unit {
                    debug!("Worker picked up {}", test_case);
                    results.push(runner.run_test(test_case).await);
                }
                results
            });

            handles.push((cases, handle));
        }

        let (cases, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let mut results = Vec::with_capacity(count);

        for (unit, joined) in cases.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(unit_results) => results.extend(unit_results),
                Err(e) => {
                    error!("Worker crashed: {}", e);
                    results.extend(
                        unit.into_iter()
                            .map(|case| TestResult::fail(case, 0, format!("Worker crashed: {e}"))),
                    );
                }
            }
        }

        results.sort_by_key(|r| r.test_case);

        info!(
            "Parallel execution completed in {}ms",
            timer.elapsed_ms()
        );
        results
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::config::{RunnerConfig, TestEnv};
    use crate::models::TestStatus;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner(server: &MockServer, dir: &TempDir, fully_parallel: bool) -> Arc<TestRunner> {
        let uri = server.uri();
        let env = TestEnv::load_from(move |key| (key == "BASE_URL").then(|| uri.clone()));
        let mut config = RunnerConfig::default().with_output_dir(dir.path());
        config.workers = Some(3);
        config.fully_parallel = fully_parallel;
        Arc::new(TestRunner::new(Arc::new(env), Arc::new(config)).unwrap())
    }

    #[tokio::test]
    async fn test_units() {
        let server_dir = TempDir::new().unwrap();
        let server = MockServer::start().await;

        let cases = vec![
            TestCase::ApiRoot,
            TestCase::RespondsToRequests,
            TestCase::RejectUnauthenticated,
        ];
        let serial = ParallelExecutor::new(runner(&server, &server_dir, false));
        assert_eq!(
            serial.units(cases.clone()),
            vec![
                vec![TestCase::ApiRoot, TestCase::RejectUnauthenticated],
                vec![TestCase::RespondsToRequests],
            ]
        );

        let parallel = ParallelExecutor::new(runner(&server, &server_dir, true));
        assert_eq!(parallel.max_concurrent, 3);
        assert_eq!(parallel.units(cases).len(), 3);
    }

    #[tokio::test]
    async fn test_results_in_registry_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": "/p", "engagements": "/e", "findings": "/f", "tests": "/t"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/products/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut executor = ParallelExecutor::new(runner(&server, &dir, true));
        executor.max_concurrent = 2;
        let results = executor
            .run(vec![
                TestCase::ResponseTime,
                TestCase::ApiRoot,
                TestCase::RejectWithoutToken,
                TestCase::AcceptValidToken,
            ])
            .await;

        let order: Vec<TestCase> = results.iter().map(|r| r.test_case).collect();
        assert_eq!(
            order,
            vec![
                TestCase::ApiRoot,
                TestCase::RejectWithoutToken,
                TestCase::AcceptValidToken,
                TestCase::ResponseTime,
            ]
        );
        assert_eq!(results[0].status, TestStatus::Pass);
        assert_eq!(results[1].status, TestStatus::Pass);
        assert_eq!(results[2].status, TestStatus::Skip);
        assert_eq!(results[3].status, TestStatus::Pass);
    }
}
