//! Product Management (e2e)

use anyhow::Result;

use super::expect;
use super::login::login_as_admin;
use super::TestContext;
use crate::browser::Locator;

const PRODUCTS_PATH: &str = "/product";

fn products_table() -> Locator {
    Locator::any_css(&["table", ".product-list", "[data-testid=\"products\"]"])
}

fn name_filter() -> Locator {
    Locator::any_css(&[
        "input[name=\"name\"]",
        "input[placeholder*=\"search\"]",
        "input[placeholder*=\"filter\"]",
    ])
}

fn product_link() -> Locator {
    Locator::css("a[href*=\"/product/\"]")
}

/// Log in and land on the product listing
async fn open_products(ctx: &TestContext) -> Result<()> {
    login_as_admin(ctx).await?;
    ctx.step("open products", ctx.browser()?.goto(PRODUCTS_PATH))
        .await
}

pub async fn products_list(ctx: &TestContext) -> Result<()> {
    open_products(ctx).await?;
    let page = ctx.browser()?;
    ctx.step("URL matches product", expect::url(page, &expect::pattern("product")?, true))
        .await?;
    ctx.step("products list visible", expect::visible(page, &products_table()))
        .await?;
    Ok(())
}

pub async fn filter_by_name(ctx: &TestContext) -> Result<()> {
    open_products(ctx).await?;
    let page = ctx.browser()?;
    let Some(input) = ctx.optional("name filter present", &name_filter()).await? else {
        return Ok(());
    };
    ctx.step("fill filter", page.fill(&input, "test")).await?;
    ctx.step("press Enter", page.press_enter(&input)).await?;
    ctx.step("wait for network idle", page.wait_for_network_idle())
        .await
}

pub async fn product_details(ctx: &TestContext) -> Result<()> {
    open_products(ctx).await?;
    let page = ctx.browser()?;
    let Some(link) = ctx.optional("product link present", &product_link()).await? else {
        return Ok(());
    };
    ctx.step("open product", page.click(&link)).await?;
    ctx.step(
        "URL is a product detail page",
        expect::url(page, &expect::pattern(r"/product/\d+")?, true),
    )
    .await
}

/// Findings counts depend on data, so only the page load is asserted
pub async fn findings_count(ctx: &TestContext) -> Result<()> {
    open_products(ctx).await?;
    ctx.step(
        "URL matches product",
        expect::url(ctx.browser()?, &expect::pattern("product")?, true),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::test_support::*;
    use crate::models::StepOutcome;
    use crate::suites::login::test_support::*;
    use crate::suites::test_support::context;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::Mock;

    #[tokio::test]
    async fn test_missing_product_link_is_not_applicable() {
        let server = driver().await;
        mount_login_form(&server).await;
        mount_url(&server, "http://dojo.test/product").await;
        Mock::given(method("POST"))
            .and(path(session_path("/elements")))
            .and(body_partial_json(json!({ "value": "a[href*=\"/product/\"]" })))
            .respond_with(ok(json!([])))
            .mount(&server)
            .await;

        let ctx = context(&server).with_browser(session(&server).await);
        product_details(&ctx).await.unwrap();

        let last = ctx.steps().pop().unwrap();
        assert_eq!(last.name, "product link present");
        assert!(matches!(last.outcome, StepOutcome::NotApplicable(_)));
    }

    #[tokio::test]
    async fn test_product_detail_navigation() {
        let server = driver().await;
        mount_login_form(&server).await;
        mount_url(&server, "http://dojo.test/product/12").await;
        Mock::given(method("POST"))
            .and(path(session_path("/elements")))
            .and(body_partial_json(json!({ "value": "a[href*=\"/product/\"]" })))
            .respond_with(ok(json!([element("p12")])))
            .mount(&server)
            .await;

        let ctx = context(&server).with_browser(session(&server).await);
        product_details(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_products_list_visible() {
        let server = driver().await;
        mount_login_form(&server).await;
        mount_url(&server, "http://dojo.test/product").await;
        Mock::given(method("POST"))
            .and(path(session_path("/elements")))
            .and(body_partial_json(json!({ "value": "table" })))
            .respond_with(ok(json!([element("tbl")])))
            .mount(&server)
            .await;

        let ctx = context(&server).with_browser(session(&server).await);
        products_list(&ctx).await.unwrap();
        findings_count(&ctx).await.unwrap();
    }
}
