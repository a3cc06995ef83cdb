//! Registered test cases
//!
//! Every check the harness knows about, grouped by suite and describe block.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Requirement;

/// Independent test suites
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    /// Browser-driven end-to-end tests
    E2e,
    /// API and health checks against a live deployment
    Smoke,
}

impl Suite {
    pub fn name(&self) -> &'static str {
        match self {
            Suite::E2e => "e2e",
            Suite::Smoke => "smoke",
        }
    }

    pub fn all() -> Vec<Suite> {
        vec![Suite::E2e, Suite::Smoke]
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a test case talks to the system under test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Http,
    Browser,
}

impl Driver {
    pub fn name(&self) -> &'static str {
        match self {
            Driver::Http => "http",
            Driver::Browser => "browser",
        }
    }
}

/// All registered test cases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCase {
    // e2e: API Endpoints
    ApiRoot,
    ObtainApiToken,
    RejectUnauthenticated,
    ProductsWithToken,
    FindingsWithToken,
    ProductTypesWithToken,
    UsersWithToken,

    // e2e: Login Flow
    LoginPageDisplayed,
    RejectInvalidCredentials,
    LoginWithValidCredentials,
    SessionMaintained,
    Logout,

    // e2e: Product Management
    ProductsList,
    FilterProductsByName,
    ProductDetails,
    ProductFindingsCount,

    // e2e: Findings Management
    FindingsList,
    FilterFindingsBySeverity,
    FindingDetailNavigation,
    FindingDetailsDisplayed,
    SearchFindings,

    // smoke: Authentication
    RejectWithoutToken,
    RejectInvalidToken,
    AcceptValidToken,
    UserInfoWithToken,
    EngagementsWithToken,
    TestsEndpointWithToken,

    // smoke: Health Checks
    RespondsToRequests,
    ApiRootAccessible,
    ApiSchemaValid,
    LoginPageAccessible,
    ValidSslCertificate,
    CorsHeaders,
    ResponseTime,

    // smoke: Scan Import
    ImportSemgrep,
    ImportTrivy,
    QueryImportedFindings,
    QueryFindingsBySeverity,
    TestProductExists,
}

impl TestCase {
    /// Test title as shown in reports
    pub fn name(&self) -> &'static str {
        match self {
            TestCase::ApiRoot => "should return API root",
            TestCase::ObtainApiToken => "should obtain API token with credentials",
            TestCase::RejectUnauthenticated => {
                "should reject unauthenticated requests to protected endpoints"
            }
            TestCase::ProductsWithToken => "should access products with valid token",
            TestCase::FindingsWithToken => "should access findings with valid token",
            TestCase::ProductTypesWithToken => "should access product types with valid token",
            TestCase::UsersWithToken => "should access users endpoint with valid token",
            TestCase::LoginPageDisplayed => "should display login page",
            TestCase::RejectInvalidCredentials => "should reject invalid credentials",
            TestCase::LoginWithValidCredentials => "should login with valid credentials",
            TestCase::SessionMaintained => "should maintain session after login",
            TestCase::Logout => "should be able to logout",
            TestCase::ProductsList => "should display products list",
            TestCase::FilterProductsByName => "should filter products by name",
            TestCase::ProductDetails => "should navigate to product details",
            TestCase::ProductFindingsCount => "should display product findings count",
            TestCase::FindingsList => "should display findings list",
            TestCase::FilterFindingsBySeverity => "should filter findings by severity",
            TestCase::FindingDetailNavigation => "should navigate to finding detail",
            TestCase::FindingDetailsDisplayed => "should display finding details",
            TestCase::SearchFindings => "should search findings",
            TestCase::RejectWithoutToken => "should reject requests without token",
            TestCase::RejectInvalidToken => "should reject requests with invalid token",
            TestCase::AcceptValidToken => "should accept valid API token",
            TestCase::UserInfoWithToken => "should return user info with valid token",
            TestCase::EngagementsWithToken => "should access engagements with valid token",
            TestCase::TestsEndpointWithToken => "should access tests endpoint with valid token",
            TestCase::RespondsToRequests => "should respond to HTTP/HTTPS requests",
            TestCase::ApiRootAccessible => "should have accessible API root",
            TestCase::ApiSchemaValid => "should return valid API schema",
            TestCase::LoginPageAccessible => "should have login page accessible",
            TestCase::ValidSslCertificate => "should have valid SSL certificate",
            TestCase::CorsHeaders => "should return proper CORS headers",
            TestCase::ResponseTime => "should have reasonable response time",
            TestCase::ImportSemgrep => "should import Semgrep scan results",
            TestCase::ImportTrivy => "should import Trivy scan results",
            TestCase::QueryImportedFindings => "should query imported findings",
            TestCase::QueryFindingsBySeverity => "should query findings by severity",
            TestCase::TestProductExists => "should verify test product exists",
        }
    }

    /// Describe block the case belongs to
    pub fn group(&self) -> &'static str {
        use TestCase::*;
        match self {
            ApiRoot | ObtainApiToken | RejectUnauthenticated | ProductsWithToken
            | FindingsWithToken | ProductTypesWithToken | UsersWithToken => "API Endpoints",
            LoginPageDisplayed | RejectInvalidCredentials | LoginWithValidCredentials
            | SessionMaintained | Logout => "Login Flow",
            ProductsList | FilterProductsByName | ProductDetails | ProductFindingsCount => {
                "Product Management"
            }
            FindingsList | FilterFindingsBySeverity | FindingDetailNavigation
            | FindingDetailsDisplayed | SearchFindings => "Findings Management",
            RejectWithoutToken | RejectInvalidToken | AcceptValidToken | UserInfoWithToken
            | EngagementsWithToken | TestsEndpointWithToken => "Authentication Smoke Tests",
            RespondsToRequests | ApiRootAccessible | ApiSchemaValid | LoginPageAccessible
            | ValidSslCertificate | CorsHeaders | ResponseTime => "Health Checks",
            ImportSemgrep | ImportTrivy | QueryImportedFindings | QueryFindingsBySeverity
            | TestProductExists => "Scan Import Smoke Tests",
        }
    }

    pub fn suite(&self) -> Suite {
        match self.group() {
            "API Endpoints" | "Login Flow" | "Product Management" | "Findings Management" => {
                Suite::E2e
            }
            _ => Suite::Smoke,
        }
    }

    pub fn driver(&self) -> Driver {
        match self.group() {
            "Login Flow" | "Product Management" | "Findings Management" => Driver::Browser,
            _ => Driver::Http,
        }
    }

    /// Configuration that must be present for the case to run
    pub fn requirements(&self) -> &'static [Requirement] {
        use TestCase::*;
        match self {
            ObtainApiToken | LoginWithValidCredentials | SessionMaintained | Logout => {
                &[Requirement::AdminPassword]
            }
            ProductsList | FilterProductsByName | ProductDetails | ProductFindingsCount
            | FindingsList | FilterFindingsBySeverity | FindingDetailNavigation
            | FindingDetailsDisplayed | SearchFindings => &[Requirement::AdminPassword],
            ProductsWithToken | FindingsWithToken | ProductTypesWithToken | UsersWithToken
            | AcceptValidToken | UserInfoWithToken | EngagementsWithToken
            | TestsEndpointWithToken => &[Requirement::ApiToken],
            ImportSemgrep | ImportTrivy | QueryImportedFindings | QueryFindingsBySeverity
            | TestProductExists => &[Requirement::ApiToken],
            ValidSslCertificate => &[Requirement::Https],
            _ => &[],
        }
    }

    /// Filesystem-safe identifier used for artifact directories
    pub fn slug(&self) -> String {
        let mut slug = format!("{}-{}-", self.suite(), self.group());
        slug.push_str(self.name());
        slug.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Full title used for filtering: "suite > group > name"
    pub fn title(&self) -> String {
        format!("{} > {} > {}", self.suite(), self.group(), self.name())
    }

    pub fn all() -> Vec<TestCase> {
        use TestCase::*;
        vec![
            ApiRoot,
            ObtainApiToken,
            RejectUnauthenticated,
            ProductsWithToken,
            FindingsWithToken,
            ProductTypesWithToken,
            UsersWithToken,
            LoginPageDisplayed,
            RejectInvalidCredentials,
            LoginWithValidCredentials,
            SessionMaintained,
            Logout,
            ProductsList,
            FilterProductsByName,
            ProductDetails,
            ProductFindingsCount,
            FindingsList,
            FilterFindingsBySeverity,
            FindingDetailNavigation,
            FindingDetailsDisplayed,
            SearchFindings,
            RejectWithoutToken,
            RejectInvalidToken,
            AcceptValidToken,
            UserInfoWithToken,
            EngagementsWithToken,
            TestsEndpointWithToken,
            RespondsToRequests,
            ApiRootAccessible,
            ApiSchemaValid,
            LoginPageAccessible,
            ValidSslCertificate,
            CorsHeaders,
            ResponseTime,
            ImportSemgrep,
            ImportTrivy,
            QueryImportedFindings,
            QueryFindingsBySeverity,
            TestProductExists,
        ]
    }

    pub fn for_suite(suite: Suite) -> Vec<TestCase> {
        Self::all()
            .into_iter()
            .filter(|c| c.suite() == suite)
            .collect()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} > {}", self.suite(), self.group(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_partition() {
        assert_eq!(TestCase::all().len(), 39);
        assert_eq!(TestCase::for_suite(Suite::E2e).len(), 21);
        assert_eq!(TestCase::for_suite(Suite::Smoke).len(), 18);
    }

    #[test]
    fn test_browser_cases_are_e2e() {
        for case in TestCase::all() {
            if case.driver() == Driver::Browser {
                assert_eq!(case.suite(), Suite::E2e, "{case}");
            }
        }
    }

    #[test]
    fn test_requirements() {
        assert!(TestCase::ApiRoot.requirements().is_empty());
        assert!(TestCase::RejectUnauthenticated.requirements().is_empty());
        assert!(TestCase::RejectInvalidCredentials.requirements().is_empty());
        assert_eq!(
            TestCase::ImportSemgrep.requirements(),
            &[Requirement::ApiToken]
        );
        assert_eq!(
            TestCase::Logout.requirements(),
            &[Requirement::AdminPassword]
        );
        assert_eq!(
            TestCase::ValidSslCertificate.requirements(),
            &[Requirement::Https]
        );
    }

    #[test]
    fn test_slug() {
        assert_eq!(
            TestCase::RespondsToRequests.slug(),
            "smoke-health-checks-should-respond-to-http-https-requests"
        );
    }
}
