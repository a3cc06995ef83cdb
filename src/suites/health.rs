//! Health Checks
//!
//! Availability of the web front end and the API root.

use anyhow::Result;

use super::expect;
use super::TestContext;
use crate::http::api::API_ROOT;
use crate::http::{Auth, HttpRequest};

/// Upper bound for the API root round trip
pub const RESPONSE_TIME_LIMIT_MS: u64 = 5000;

/// Origin sent by the CORS check
pub const CORS_ORIGIN: &str = "http://localhost:3000";

const REACHABLE: &[u16] = &[200, 301, 302];

pub async fn responds(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /", ctx.api().get("/", Auth::None)).await?;
    ctx.check("status is 200, 301 or 302", expect::status_in(&response, REACHABLE))
}

pub async fn api_root_accessible(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /api/v2/", ctx.api().root()).await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check(
        "content type is JSON",
        expect::header_contains(&response, "content-type", "application/json"),
    )
}

pub async fn api_schema(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /api/v2/", ctx.api().root()).await?;
    ctx.check(
        "lists products, findings, engagements and tests",
        expect::fields(&response, &["products", "findings", "engagements", "tests"]),
    )
}

pub async fn login_page_accessible(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /login", ctx.api().get("/login", Auth::None)).await?;
    ctx.check("status is 200, 301 or 302", expect::status_in(&response, REACHABLE))
}

/// The HTTP client verifies certificates, so a completed request is the
/// handshake assertion
pub async fn ssl_certificate(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /api/v2/ over TLS", ctx.api().root()).await?;
    ctx.check("status is 200", expect::status(&response, 200))
}

pub async fn cors_headers(ctx: &TestContext) -> Result<()> {
    let request = HttpRequest::get(API_ROOT).header("Origin", CORS_ORIGIN);
    let response = ctx
        .step("GET /api/v2/ with Origin", ctx.api().send(request))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))
}

pub async fn response_time(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /api/v2/", ctx.api().root()).await?;
    ctx.check(
        "responds within 5s",
        expect::faster_than(response.duration_ms, RESPONSE_TIME_LIMIT_MS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::test_support::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_root(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": "/api/v2/products/",
                "engagements": "/api/v2/engagements/",
                "findings": "/api/v2/findings/",
                "tests": "/api/v2/tests/"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_redirecting_front_page_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server);
        responds(&ctx).await.unwrap();
        assert!(ctx.steps().iter().all(|s| !s.outcome.is_failed()));
    }

    #[tokio::test]
    async fn test_redirect_to_broken_page_is_not_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login"))
            .mount(&server)
            .await;

        let err = responds(&context(&server)).await.unwrap_err();
        assert!(err.to_string().contains("got 404"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        assert!(login_page_accessible(&context(&server)).await.is_err());
    }

    #[tokio::test]
    async fn test_root_checks() {
        let server = MockServer::start().await;
        mount_root(&server).await;

        let ctx = context(&server);
        api_root_accessible(&ctx).await.unwrap();
        api_schema(&ctx).await.unwrap();
        response_time(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_cors_sends_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .and(header("Origin", CORS_ORIGIN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        cors_headers(&context(&server)).await.unwrap();
    }
}
