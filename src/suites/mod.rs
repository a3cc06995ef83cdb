//! DefectDojo test suites
//!
//! Implementations of every registered [`TestCase`], grouped the way the
//! reports group them.
//!
//! ## e2e
//! - API Endpoints (`api`)
//! - Login Flow (`login`)
//! - Product Management (`products`)
//! - Findings Management (`findings`)
//!
//! ## smoke
//! - Authentication Smoke Tests (`auth`)
//! - Health Checks (`health`)
//! - Scan Import Smoke Tests (`import`)

mod api;
mod auth;
pub mod expect;
mod findings;
mod health;
mod import;
mod login;
mod products;

use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

use crate::browser::{BrowserSession, ElementRef, Locator};
use crate::config::TestEnv;
use crate::fixtures::FixtureLoader;
use crate::http::DojoApi;
use crate::models::{StepOutcome, StepRecord, TestCase};

/// Everything one attempt of a test case may touch
pub struct TestContext {
    env: Arc<TestEnv>,
    api: DojoApi,
    fixtures: FixtureLoader,
    browser: Option<BrowserSession>,
    steps: Mutex<Vec<StepRecord>>,
}

impl TestContext {
    pub fn new(env: Arc<TestEnv>, api: DojoApi, fixtures: FixtureLoader) -> Self {
        Self {
            env,
            api,
            fixtures,
            browser: None,
            steps: Mutex::new(Vec::new()),
        }
    }

    pub fn with_browser(mut self, session: BrowserSession) -> Self {
        self.browser = Some(session);
        self
    }

    pub fn env(&self) -> &TestEnv {
        &self.env
    }

    pub fn api(&self) -> &DojoApi {
        &self.api
    }

    pub fn fixtures(&self) -> &FixtureLoader {
        &self.fixtures
    }

    pub fn browser(&self) -> Result<&BrowserSession> {
        self.browser
            .as_ref()
            .ok_or_else(|| anyhow!("No browser session for this test case"))
    }

    pub fn take_browser(&mut self) -> Option<BrowserSession> {
        self.browser.take()
    }

    /// Token the runner already checked is present
    pub fn token(&self) -> Result<&str> {
        self.env
            .api_token()
            .ok_or_else(|| anyhow!("DEFECTDOJO_TOKEN is not set"))
    }

    pub fn admin_password(&self) -> Result<&str> {
        self.env
            .admin_password()
            .ok_or_else(|| anyhow!("ADMIN_PASSWORD is not set"))
    }

    fn record(&self, name: &str, outcome: StepOutcome, started: Instant) {
        debug!("step '{}': {:?}", name, outcome);
        let record = StepRecord {
            name: name.to_string(),
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(record);
        }
    }

    /// Run one step, recording whether it passed
    pub async fn step<T, E, F>(&self, name: &str, action: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let started = Instant::now();
        match action.await {
            Ok(value) => {
                self.record(name, StepOutcome::Passed, started);
                Ok(value)
            }
            Err(e) => {
                let err = e.into();
                self.record(name, StepOutcome::Failed(format!("{err:#}")), started);
                Err(err)
            }
        }
    }

    /// Record an immediate assertion
    pub fn check<T>(&self, name: &str, result: expect::Check<T>) -> Result<T> {
        let started = Instant::now();
        match result {
            Ok(value) => {
                self.record(name, StepOutcome::Passed, started);
                Ok(value)
            }
            Err(e) => {
                self.record(name, StepOutcome::Failed(e.0.clone()), started);
                Err(e.into())
            }
        }
    }

    pub fn not_applicable(&self, name: &str, reason: impl Into<String>) {
        self.record(name, StepOutcome::NotApplicable(reason.into()), Instant::now());
    }

    /// Look up an element the step depends on, once
    ///
    /// When nothing matches the step is recorded as not applicable and
    /// `None` is returned; the case carries on.
    pub async fn optional(&self, name: &str, locator: &Locator) -> Result<Option<ElementRef>> {
        let started = Instant::now();
        let found = locator.first_visible(self.browser()?).await?;
        match &found {
            Some(_) => self.record(name, StepOutcome::Passed, started),
            None => self.record(
                name,
                StepOutcome::NotApplicable(format!("no visible {locator}")),
                started,
            ),
        }
        Ok(found)
    }

    /// Steps recorded so far
    pub fn steps(&self) -> Vec<StepRecord> {
        self.steps
            .lock()
            .map(|steps| steps.clone())
            .unwrap_or_default()
    }
}

/// Run the body of a test case
pub async fn run_case(case: TestCase, ctx: &TestContext) -> Result<()> {
    use TestCase::*;
    match case {
        ApiRoot => api::api_root(ctx).await,
        ObtainApiToken => api::obtain_token(ctx).await,
        RejectUnauthenticated => api::reject_unauthenticated(ctx).await,
        ProductsWithToken => api::products_with_token(ctx).await,
        FindingsWithToken => api::findings_with_token(ctx).await,
        ProductTypesWithToken => api::product_types_with_token(ctx).await,
        UsersWithToken => api::users_with_token(ctx).await,

        LoginPageDisplayed => login::login_page_displayed(ctx).await,
        RejectInvalidCredentials => login::reject_invalid_credentials(ctx).await,
        LoginWithValidCredentials => login::login_with_valid_credentials(ctx).await,
        SessionMaintained => login::session_maintained(ctx).await,
        Logout => login::logout(ctx).await,

        ProductsList => products::products_list(ctx).await,
        FilterProductsByName => products::filter_by_name(ctx).await,
        ProductDetails => products::product_details(ctx).await,
        ProductFindingsCount => products::findings_count(ctx).await,

        FindingsList => findings::findings_list(ctx).await,
        FilterFindingsBySeverity => findings::filter_by_severity(ctx).await,
        FindingDetailNavigation => findings::detail_navigation(ctx).await,
        FindingDetailsDisplayed => findings::details_displayed(ctx).await,
        SearchFindings => findings::search(ctx).await,

        RejectWithoutToken => auth::reject_without_token(ctx).await,
        RejectInvalidToken => auth::reject_invalid_token(ctx).await,
        AcceptValidToken => auth::accept_valid_token(ctx).await,
        UserInfoWithToken => auth::user_info(ctx).await,
        EngagementsWithToken => auth::engagements(ctx).await,
        TestsEndpointWithToken => auth::tests_endpoint(ctx).await,

        RespondsToRequests => health::responds(ctx).await,
        ApiRootAccessible => health::api_root_accessible(ctx).await,
        ApiSchemaValid => health::api_schema(ctx).await,
        LoginPageAccessible => health::login_page_accessible(ctx).await,
        ValidSslCertificate => health::ssl_certificate(ctx).await,
        CorsHeaders => health::cors_headers(ctx).await,
        ResponseTime => health::response_time(ctx).await,

        ImportSemgrep => import::import_semgrep(ctx).await,
        ImportTrivy => import::import_trivy(ctx).await,
        QueryImportedFindings => import::query_imported(ctx).await,
        QueryFindingsBySeverity => import::query_by_severity(ctx).await,
        TestProductExists => import::product_exists(ctx).await,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Contexts wired to mock servers.

    use super::*;
    use wiremock::MockServer;

    pub const TOKEN: &str = "test-token";
    pub const PASSWORD: &str = "admin-pw";

    pub fn env_for(server: &MockServer, token: bool, password: bool) -> Arc<TestEnv> {
        let uri = server.uri();
        Arc::new(TestEnv::load_from(move |key| match key {
            "BASE_URL" => Some(uri.clone()),
            "DEFECTDOJO_TOKEN" if token => Some(TOKEN.to_string()),
            "ADMIN_PASSWORD" if password => Some(PASSWORD.to_string()),
            _ => None,
        }))
    }

    pub fn context(server: &MockServer) -> TestContext {
        let env = env_for(server, true, true);
        let api = DojoApi::new(&env, 5).unwrap();
        let fixtures = FixtureLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"));
        TestContext::new(env, api, fixtures)
    }
}
