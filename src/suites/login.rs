//! Login Flow (e2e)
//!
//! Form login through the browser, plus the shared login helper the other
//! browser groups start from.

use anyhow::Result;

use super::expect;
use super::TestContext;
use crate::browser::{Locator, Selector};

pub const LOGIN_PATH: &str = "/login";
const PROTECTED_PATH: &str = "/product";

const INVALID_USERNAME: &str = "invalid_user";
const INVALID_PASSWORD: &str = "invalid_password";

fn username_input() -> Locator {
    Locator::css("input[name=\"username\"]")
}

fn password_input() -> Locator {
    Locator::css("input[name=\"password\"]")
}

fn submit_button() -> Locator {
    Locator::any_css(&["button[type=\"submit\"]", "input[type=\"submit\"]"])
}

fn logout_control() -> Locator {
    Locator::text("Logout").or(Selector::Css("a[href*=\"logout\"]".to_string()))
}

/// Start from a clean cookie jar on the login page
async fn open_login(ctx: &TestContext) -> Result<()> {
    let page = ctx.browser()?;
    // Some drivers refuse cookie commands before the first navigation
    if let Err(e) = page.delete_cookies().await {
        ctx.not_applicable("clear cookies", e.to_string());
    }
    ctx.step("open login page", page.goto(LOGIN_PATH)).await
}

async fn submit_credentials(ctx: &TestContext, username: &str, password: &str) -> Result<()> {
    let page = ctx.browser()?;
    let user = ctx
        .step("username field visible", expect::visible(page, &username_input()))
        .await?;
    ctx.step("fill username", page.fill(&user, username)).await?;
    let pass = ctx
        .step("password field visible", expect::visible(page, &password_input()))
        .await?;
    ctx.step("fill password", page.fill(&pass, password)).await?;
    let submit = ctx
        .step("submit button visible", expect::visible(page, &submit_button()))
        .await?;
    ctx.step("submit", page.click(&submit)).await
}

/// Log in as the admin user and wait to leave the login page
pub(super) async fn login_as_admin(ctx: &TestContext) -> Result<()> {
    let password = ctx.admin_password()?;
    open_login(ctx).await?;
    submit_credentials(ctx, ctx.env().admin_username(), password).await?;

    let login = expect::pattern("login")?;
    ctx.step("URL leaves login", expect::url(ctx.browser()?, &login, false))
        .await
}

pub async fn login_page_displayed(ctx: &TestContext) -> Result<()> {
    let page = ctx.browser()?;
    open_login(ctx).await?;
    ctx.step("username field visible", expect::visible(page, &username_input()))
        .await?;
    ctx.step("password field visible", expect::visible(page, &password_input()))
        .await?;
    ctx.step("submit button visible", expect::visible(page, &submit_button()))
        .await?;
    Ok(())
}

pub async fn reject_invalid_credentials(ctx: &TestContext) -> Result<()> {
    open_login(ctx).await?;
    submit_credentials(ctx, INVALID_USERNAME, INVALID_PASSWORD).await?;

    let login = expect::pattern("login")?;
    ctx.step("URL stays on login", expect::url(ctx.browser()?, &login, true))
        .await
}

pub async fn login_with_valid_credentials(ctx: &TestContext) -> Result<()> {
    login_as_admin(ctx).await?;

    let cookies = ctx.step("read cookies", ctx.browser()?.cookies()).await?;
    let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
    ctx.check(
        "session cookie set",
        if names
            .iter()
            .any(|n| n.contains("session") || n.contains("csrf"))
        {
            Ok(())
        } else {
            Err(expect::AssertionError(format!(
                "no session or csrf cookie among {names:?}"
            )))
        },
    )
}

pub async fn session_maintained(ctx: &TestContext) -> Result<()> {
    let password = ctx.admin_password()?;
    open_login(ctx).await?;
    submit_credentials(ctx, ctx.env().admin_username(), password).await?;

    let page = ctx.browser()?;
    ctx.step("open protected page", page.goto(PROTECTED_PATH)).await?;
    let login = expect::pattern("login")?;
    ctx.step("not redirected to login", expect::url(page, &login, false))
        .await
}

pub async fn logout(ctx: &TestContext) -> Result<()> {
    login_as_admin(ctx).await?;

    let page = ctx.browser()?;
    let control = ctx
        .step("logout control visible", expect::visible(page, &logout_control()))
        .await?;
    ctx.step("click logout", page.click(&control)).await?;
    let login = expect::pattern("login")?;
    ctx.step("redirected to login", expect::url(page, &login, true))
        .await
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Mock WebDriver endpoints for a login page.

    use crate::browser::test_support::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer};

    /// Cookie, navigation and form-control endpoints; every element is shown
    pub async fn mount_login_form(server: &MockServer) {
        Mock::given(method("DELETE"))
            .and(path(session_path("/cookie")))
            .respond_with(ok(Value::Null))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(session_path("/url")))
            .respond_with(ok(Value::Null))
            .mount(server)
            .await;
        for (selector, id) in [
            ("input[name=\"username\"]", "user"),
            ("input[name=\"password\"]", "pass"),
            ("button[type=\"submit\"]", "submit"),
        ] {
            Mock::given(method("POST"))
                .and(path(session_path("/elements")))
                .and(body_partial_json(json!({ "value": selector })))
                .respond_with(ok(json!([element(id)])))
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path_regex(r"/element/[^/]+/displayed$"))
            .respond_with(ok(json!(true)))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"/element/[^/]+/(clear|value|click)$"))
            .respond_with(ok(Value::Null))
            .mount(server)
            .await;
    }

    /// Current URL reported by the driver
    pub async fn mount_url(server: &MockServer, url: &str) {
        Mock::given(method("GET"))
            .and(path(session_path("/url")))
            .respond_with(ok(json!(url)))
            .mount(server)
            .await;
    }
}
