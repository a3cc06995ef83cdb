//! Environment variable configuration
//!
//! Resolves the effective test configuration from the process environment.

use std::env;
use std::fmt;

/// Default DefectDojo address when BASE_URL is not set
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default admin account name when ADMIN_USERNAME is not set
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

pub const BASE_URL_VAR: &str = "BASE_URL";
pub const TOKEN_VAR: &str = "DEFECTDOJO_TOKEN";
pub const ADMIN_USERNAME_VAR: &str = "ADMIN_USERNAME";
pub const ADMIN_PASSWORD_VAR: &str = "ADMIN_PASSWORD";
pub const CI_VAR: &str = "CI";
pub const WEBDRIVER_URL_VAR: &str = "WEBDRIVER_URL";

/// Effective test configuration, built once per process
#[derive(Clone, PartialEq, Eq)]
pub struct TestEnv {
    base_url: String,
    admin_username: String,
    admin_password: Option<String>,
    api_token: Option<String>,
    webdriver_url: Option<String>,
    ci: bool,
}

/// Configuration a test case needs before it may run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Requirement {
    ApiToken,
    AdminPassword,
    Https,
}

impl Requirement {
    /// Reason reported when the requirement is not met
    pub fn skip_reason(&self) -> &'static str {
        match self {
            Requirement::ApiToken => "DEFECTDOJO_TOKEN environment variable not set",
            Requirement::AdminPassword => "ADMIN_PASSWORD environment variable not set",
            Requirement::Https => "Not using HTTPS",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Requirement::ApiToken => "token",
            Requirement::AdminPassword => "password",
            Requirement::Https => "https",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TestEnv {
    /// Load configuration from the process environment
    pub fn load() -> Self {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated the same as unset ones.
    pub fn load_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty(BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            base_url,
            admin_username: non_empty(ADMIN_USERNAME_VAR)
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password: non_empty(ADMIN_PASSWORD_VAR),
            api_token: non_empty(TOKEN_VAR),
            webdriver_url: non_empty(WEBDRIVER_URL_VAR),
            ci: non_empty(CI_VAR).is_some(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn admin_password(&self) -> Option<&str> {
        self.admin_password.as_deref()
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn webdriver_url(&self) -> Option<&str> {
        self.webdriver_url.as_deref()
    }

    pub fn is_ci(&self) -> bool {
        self.ci
    }

    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https")
    }

    /// Check whether a single requirement is satisfied
    pub fn satisfies(&self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::ApiToken => self.api_token.is_some(),
            Requirement::AdminPassword => self.admin_password.is_some(),
            Requirement::Https => self.is_https(),
        }
    }

    /// Skip reason for the first unmet requirement, if any
    pub fn unmet(&self, requirements: &[Requirement]) -> Option<&'static str> {
        requirements
            .iter()
            .find(|r| !self.satisfies(**r))
            .map(|r| r.skip_reason())
    }

    /// Human readable summary with secrets masked
    pub fn summary(&self) -> String {
        let mask = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        format!(
            "  {BASE_URL_VAR}:          {}\n  {ADMIN_USERNAME_VAR}:    {}\n  {ADMIN_PASSWORD_VAR}:    {}\n  {TOKEN_VAR}:  {}\n  {WEBDRIVER_URL_VAR}:     {}\n  {CI_VAR}:                {}",
            self.base_url,
            self.admin_username,
            mask(&self.admin_password),
            mask(&self.api_token),
            self.webdriver_url.as_deref().unwrap_or("(default)"),
            self.ci
        )
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::load_from(|_| None)
    }
}

// Secrets never reach log output through Debug.
impl fmt::Debug for TestEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEnv")
            .field("base_url", &self.base_url)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "***"))
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("webdriver_url", &self.webdriver_url)
            .field("ci", &self.ci)
            .finish()
    }
}

/// Print all recognised environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {BASE_URL_VAR}           DefectDojo URL (default: {DEFAULT_BASE_URL})");
    println!("  {TOKEN_VAR}   API token for authenticated requests");
    println!("  {ADMIN_USERNAME_VAR}     Admin username (default: {DEFAULT_ADMIN_USERNAME})");
    println!("  {ADMIN_PASSWORD_VAR}     Admin password (credentialed tests are skipped without it)");
    println!("  {WEBDRIVER_URL_VAR}      WebDriver endpoint for browser tests");
    println!("  {CI_VAR}                 Enables CI policy (retries, single worker, forbid --only)");
    println!("  RUST_LOG           Log filter override");
    println!();
    println!("Example:");
    println!("  export {BASE_URL_VAR}=https://dojo.example.com");
    println!("  export {TOKEN_VAR}=...");
    println!("  dojo-probe run --project smoke");
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl EnvGuard {
    pub fn set(vars: &[(&str, Option<&str>)]) -> Self {
        let previous = vars
            .iter()
            .map(|(k, _)| (k.to_string(), env::var(k).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        Self { previous }
    }
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
