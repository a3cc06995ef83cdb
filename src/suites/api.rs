//! API Endpoints (e2e)
//!
//! Direct REST checks of the API root, token exchange and the token-guarded
//! listing endpoints.

use anyhow::Result;

use super::expect;
use super::TestContext;
use crate::http::api::{FINDINGS, PRODUCTS, PRODUCT_TYPES, USERS};
use crate::http::Auth;

pub async fn api_root(ctx: &TestContext) -> Result<()> {
    let response = ctx.step("GET /api/v2/", ctx.api().root()).await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check(
        "lists products, engagements and findings",
        expect::fields(&response, &["products", "engagements", "findings"]),
    )
}

pub async fn obtain_token(ctx: &TestContext) -> Result<()> {
    let password = ctx.admin_password()?;
    let response = ctx
        .step(
            "POST credentials to api-token-auth",
            ctx.api().obtain_token(ctx.env().admin_username(), password),
        )
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("token is returned", expect::non_empty_string(&response, "token"))
}

pub async fn reject_unauthenticated(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET products without token", ctx.api().get(PRODUCTS, Auth::None))
        .await?;
    ctx.check("status is 401", expect::status(&response, 401))
}

pub async fn products_with_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET products", ctx.api().get(PRODUCTS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("results is an array", expect::results(&response).map(|_| ()))
}

pub async fn findings_with_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET findings", ctx.api().get(FINDINGS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("results is an array", expect::results(&response).map(|_| ()))?;
    ctx.check("count is a non-negative integer", expect::count(&response).map(|_| ()))
}

pub async fn product_types_with_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step(
            "GET product types",
            ctx.api().get(PRODUCT_TYPES, Auth::Token(ctx.token()?)),
        )
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("results is an array", expect::results(&response).map(|_| ()))
}

pub async fn users_with_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET users", ctx.api().get(USERS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("results is an array", expect::results(&response).map(|_| ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::test_support::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_api_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": "/api/v2/products/",
                "engagements": "/api/v2/engagements/",
                "findings": "/api/v2/findings/",
                "tests": "/api/v2/tests/"
            })))
            .mount(&server)
            .await;

        let ctx = context(&server);
        api_root(&ctx).await.unwrap();
        assert_eq!(ctx.steps().len(), 3);
    }

    #[tokio::test]
    async fn test_api_root_missing_collection_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": "/p"})))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let err = api_root(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("engagements"));
        assert!(ctx.steps().last().unwrap().outcome.is_failed());
    }

    #[tokio::test]
    async fn test_obtain_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/api-token-auth/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
            .mount(&server)
            .await;

        obtain_token(&context(&server)).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthenticated_products_is_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/products/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "Authentication credentials were not provided."
            })))
            .mount(&server)
            .await;

        reject_unauthenticated(&context(&server)).await.unwrap();
    }

    #[tokio::test]
    async fn test_findings_with_token_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/findings/"))
            .and(header("Authorization", format!("Token {TOKEN}").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})),
            )
            .mount(&server)
            .await;

        findings_with_token(&context(&server)).await.unwrap();
    }

    #[tokio::test]
    async fn test_products_without_results_array_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/products/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": null})))
            .mount(&server)
            .await;

        assert!(products_with_token(&context(&server)).await.is_err());
    }

    #[tokio::test]
    async fn test_findings_with_malformed_listing_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/findings/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"count": "many", "results": null})),
            )
            .mount(&server)
            .await;

        let err = findings_with_token(&context(&server)).await.unwrap_err();
        assert!(err.to_string().contains("`results` is not an array"));
    }

    #[tokio::test]
    async fn test_findings_with_non_integer_count_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/findings/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"count": "many", "results": []})),
            )
            .mount(&server)
            .await;

        let err = findings_with_token(&context(&server)).await.unwrap_err();
        assert!(err.to_string().contains("`count` is not a non-negative integer"));
    }

    #[tokio::test]
    async fn test_users_with_non_array_results_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/users/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": "oops"})))
            .mount(&server)
            .await;

        let err = users_with_token(&context(&server)).await.unwrap_err();
        assert!(err.to_string().contains("`results` is not an array"));
    }
}
