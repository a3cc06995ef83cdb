//! Authentication Smoke Tests
//!
//! Token handling on protected endpoints.

use anyhow::Result;

use super::expect;
use super::TestContext;
use crate::http::api::{ENGAGEMENTS, INVALID_TOKEN, PRODUCTS, TESTS, USERS};
use crate::http::Auth;

pub async fn reject_without_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET products without token", ctx.api().get(PRODUCTS, Auth::None))
        .await?;
    ctx.check("status is 401", expect::status(&response, 401))
}

pub async fn reject_invalid_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step(
            "GET products with invalid token",
            ctx.api().get(PRODUCTS, Auth::Token(INVALID_TOKEN)),
        )
        .await?;
    ctx.check("status is 401", expect::status(&response, 401))
}

pub async fn accept_valid_token(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET products", ctx.api().get(PRODUCTS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))
}

pub async fn user_info(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET users", ctx.api().get(USERS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    let users = ctx.check("results is an array", expect::results(&response))?;
    ctx.check(
        "at least one user",
        if users.is_empty() {
            Err(expect::AssertionError("users listing is empty".into()))
        } else {
            Ok(())
        },
    )
}

pub async fn engagements(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET engagements", ctx.api().get(ENGAGEMENTS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("results is an array", expect::results(&response).map(|_| ()))
}

pub async fn tests_endpoint(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step("GET tests", ctx.api().get(TESTS, Auth::Token(ctx.token()?)))
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))
}
