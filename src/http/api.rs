//! DefectDojo REST API endpoints
//!
//! Thin wrapper over [`HttpClient`] naming the endpoints the suites call.

use anyhow::Result;
use serde_json::json;

use super::{HttpClient, HttpRequest, HttpResponse, MultipartForm};
use crate::config::TestEnv;

pub const API_ROOT: &str = "/api/v2/";
pub const PRODUCTS: &str = "/api/v2/products/";
pub const PRODUCT_TYPES: &str = "/api/v2/product_types/";
pub const ENGAGEMENTS: &str = "/api/v2/engagements/";
pub const FINDINGS: &str = "/api/v2/findings/";
pub const TESTS: &str = "/api/v2/tests/";
pub const USERS: &str = "/api/v2/users/";
pub const IMPORT_SCAN: &str = "/api/v2/import-scan/";
pub const TOKEN_AUTH: &str = "/api/v2/api-token-auth/";

/// Token value that is well-formed but never issued
pub const INVALID_TOKEN: &str = "invalid_token_12345";

/// How a request authenticates
#[derive(Clone, Copy, Debug)]
pub enum Auth<'a> {
    None,
    Token(&'a str),
}

/// API client bound to one target deployment
#[derive(Clone)]
pub struct DojoApi {
    client: HttpClient,
}

impl DojoApi {
    pub fn new(env: &TestEnv, timeout_secs: u64) -> Result<Self> {
        let client = HttpClient::with_timeout(timeout_secs)?
            .base_url(env.base_url())
            .default_header("User-Agent", concat!("dojo-probe/", env!("CARGO_PKG_VERSION")))?;
        Ok(Self { client })
    }

    /// Send a hand-built request against the base URL
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.client.send(request).await
    }

    fn authorize(request: HttpRequest, auth: Auth<'_>) -> HttpRequest {
        match auth {
            Auth::None => request,
            Auth::Token(token) => request.token(token),
        }
    }

    /// GET an arbitrary path relative to the base URL
    pub async fn get(&self, path: &str, auth: Auth<'_>) -> Result<HttpResponse> {
        self.client
            .send(Self::authorize(HttpRequest::get(path), auth))
            .await
    }

    /// GET a listing endpoint with query parameters
    pub async fn list(
        &self,
        endpoint: &str,
        auth: Auth<'_>,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let mut request = Self::authorize(HttpRequest::get(endpoint), auth);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        self.client.send(request).await
    }

    /// Discovery document listing the resource collections
    pub async fn root(&self) -> Result<HttpResponse> {
        self.get(API_ROOT, Auth::None).await
    }

    /// Exchange credentials for an API token
    pub async fn obtain_token(&self, username: &str, password: &str) -> Result<HttpResponse> {
        self.client
            .send(HttpRequest::post(TOKEN_AUTH).json(json!({
                "username": username,
                "password": password,
            })))
            .await
    }

    /// Upload a scan-result file
    pub async fn import_scan(&self, token: &str, form: MultipartForm) -> Result<HttpResponse> {
        self.client
            .send(HttpRequest::post(IMPORT_SCAN).token(token).multipart(form))
            .await
    }

    /// Findings listing filtered to one product
    pub async fn product_findings(&self, token: &str, product_name: &str) -> Result<HttpResponse> {
        self.list(FINDINGS, Auth::Token(token), &[("product_name", product_name)])
            .await
    }
}
