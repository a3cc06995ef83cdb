//! HTTP client for API checks
//!
//! Sends requests relative to the target base URL and captures response
//! snapshots for assertions.

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart::{Form, Part},
    Client, Method,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// HTTP client for probing the system under test
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Option<String>,
    default_headers: HeaderMap,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create client with custom timeout; TLS certificates are verified
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout_secs,
        })
    }

    /// Set base URL for requests
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add default header
    pub fn default_header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("Invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("Invalid header value")?;
        self.default_headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Build full URL
    fn build_url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => {
                if path.starts_with("http://") || path.starts_with("https://") {
                    path.to_string()
                } else {
                    format!("{}{}", base.trim_end_matches('/'), path)
                }
            }
            None => path.to_string(),
        }
    }

    /// Send HTTP request
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.build_url(&request.url);
        debug!("Sending {} request to {}", request.method, url);

        let method =
            Method::from_bytes(request.method.as_bytes()).context("Invalid HTTP method")?;
        let parsed = reqwest::Url::parse(&url).map_err(|_| HttpError::InvalidUrl(url.clone()))?;

        let mut req_builder = self.client.request(method, parsed);

        for (key, value) in &self.default_headers {
            req_builder = req_builder.header(key, value);
        }

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        req_builder = match request.body {
            RequestBody::Empty => req_builder,
            RequestBody::Json(value) => req_builder.json(&value),
            RequestBody::Multipart(form) => req_builder.multipart(form.into_form()?),
        };

        let start = Instant::now();

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                HttpError::ConnectionRefused(url.clone())
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();

        let mut response_headers = HashMap::new();
        for (key, value) in response.headers().iter() {
            if let Ok(v) = value.to_str() {
                response_headers.insert(key.to_string(), v.to_string());
            }
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Response: {} {} in {}ms",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration_ms
        );

        let json = serde_json::from_str(&body).ok();

        Ok(HttpResponse {
            status_code: status.as_u16(),
            headers: response_headers,
            body,
            json,
            duration_ms,
        })
    }
}

/// Request body variants
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// File part of a multipart upload
#[derive(Clone, Debug)]
pub struct FilePart {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Multipart form description, materialised at send time
#[derive(Clone, Debug, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, FilePart)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, part: FilePart) -> Self {
        self.files.push((name.into(), part));
        self
    }

    #[cfg(test)]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for (name, file) in self.files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)
                .context("Invalid multipart mime type")?;
            form = form.part(name, part);
        }
        Ok(form)
    }
}

/// HTTP request builder
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// DefectDojo token authentication
    pub fn token(self, token: &str) -> Self {
        self.header("Authorization", format!("Token {token}"))
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

/// HTTP response snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub json: Option<Value>,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    /// Top-level JSON field, if the body is a JSON object
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.json.as_ref().and_then(|v| v.get(key))
    }

    /// The `count` of a listing response
    pub fn count(&self) -> Option<u64> {
        self.field("count").and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_request_builder() {
        let req = HttpRequest::get("/api/v2/findings/")
            .token("abc")
            .query("severity", "Critical")
            .query("limit", "5");

        assert_eq!(req.method, "GET");
        assert_eq!(req.headers.get("Authorization").unwrap(), "Token abc");
        assert_eq!(req.query.len(), 2);
    }

    #[test]
    fn test_response_accessors() {
        let resp = HttpResponse {
            status_code: 200,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: String::new(),
            json: Some(json!({"count": 3, "results": [{"id": 1}]})),
            duration_ms: 12,
        };

        assert_eq!(
            resp.get_header("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(resp.count(), Some(3));
        assert!(resp.field("next_page").is_none());
    }

    #[tokio::test]
    async fn test_send_with_token_and_encoded_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/findings/"))
            .and(header("Authorization", "Token abc"))
            .and(query_param("product_name", "test/e2e-validation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})))
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(5).unwrap().base_url(server.uri());
        let resp = client
            .send(
                HttpRequest::get("/api/v2/findings/")
                    .token("abc")
                    .query("product_name", "test/e2e-validation"),
            )
            .await
            .unwrap();

        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.count(), Some(0));
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("name=\"scan_type\""))
            .and(body_string_contains("filename=\"results.json\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"test": 7})))
            .mount(&server)
            .await;

        let form = MultipartForm::new().text("scan_type", "Trivy Scan").file(
            "file",
            FilePart {
                file_name: "results.json".to_string(),
                mime_type: "application/json".to_string(),
                bytes: b"{}".to_vec(),
            },
        );

        let client = HttpClient::with_timeout(5).unwrap().base_url(server.uri());
        let resp = client
            .send(HttpRequest::post("/upload").multipart(form))
            .await
            .unwrap();

        assert_eq!(resp.status_code, 201);
        assert!(resp.field("test").is_some());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = HttpClient::with_timeout(2)
            .unwrap()
            .base_url("http://127.0.0.1:9");
        let err = client.send(HttpRequest::get("/")).await.unwrap_err();
        assert!(err.downcast_ref::<HttpError>().is_some());
    }
}
