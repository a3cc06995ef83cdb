//! Scan Import Smoke Tests
//!
//! Uploads the sample Semgrep and Trivy reports into the test product and
//! queries the resulting findings.

use anyhow::Result;
use std::future::ready;
use tracing::info;

use super::expect;
use super::TestContext;
use crate::fixtures::{ScanImport, ScanType, TEST_PRODUCT_NAME};
use crate::http::api::{FINDINGS, PRODUCTS};
use crate::http::Auth;

const SEVERITY: &str = "Critical";

async fn import(ctx: &TestContext, scan: ScanType, compare_counts: bool) -> Result<()> {
    let token = ctx.token()?;

    // A product with no findings yet may answer without a usable count.
    let before = if compare_counts {
        let response = ctx
            .step(
                "read finding count before import",
                ctx.api().product_findings(token, TEST_PRODUCT_NAME),
            )
            .await?;
        Some(response.count().unwrap_or(0))
    } else {
        None
    };

    let fixture = ctx
        .step(
            "load fixture",
            ready(ctx.fixtures().load(scan.fixture_name())),
        )
        .await?;
    info!(
        "Importing {} as '{}' ({} bytes)",
        fixture.name,
        scan.label(),
        fixture.bytes.len()
    );

    let form = ScanImport::new(scan).into_form(fixture);
    let response = ctx
        .step("POST import-scan", ctx.api().import_scan(token, form))
        .await?;
    ctx.check("status is 201", expect::status(&response, 201))?;
    ctx.check("response names the test", expect::fields(&response, &["test"]))?;

    if let Some(before) = before {
        let response = ctx
            .step(
                "read finding count after import",
                ctx.api().product_findings(token, TEST_PRODUCT_NAME),
            )
            .await?;
        ctx.check("status is 200", expect::status(&response, 200))?;
        let after = ctx.check("count is a non-negative integer", expect::count(&response))?;
        ctx.check(
            "finding count did not decrease",
            expect::at_least(after, before, "finding count"),
        )?;
    }
    Ok(())
}

pub async fn import_semgrep(ctx: &TestContext) -> Result<()> {
    import(ctx, ScanType::Semgrep, true).await
}

pub async fn import_trivy(ctx: &TestContext) -> Result<()> {
    import(ctx, ScanType::Trivy, false).await
}

pub async fn query_imported(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step(
            "GET findings for test product",
            ctx.api().list(
                FINDINGS,
                Auth::Token(ctx.token()?),
                &[("product_name", TEST_PRODUCT_NAME), ("limit", "10")],
            ),
        )
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("count is a non-negative integer", expect::count(&response))?;

    let findings = ctx.check("results is an array", expect::results(&response))?;
    if let Some(first) = findings.first() {
        ctx.check(
            "finding has id, title and severity",
            expect::record_fields(first, &["id", "title", "severity"]),
        )?;
    }
    Ok(())
}

pub async fn query_by_severity(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step(
            "GET critical findings",
            ctx.api().list(
                FINDINGS,
                Auth::Token(ctx.token()?),
                &[("severity", SEVERITY), ("limit", "5")],
            ),
        )
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    let findings = ctx.check("results is an array", expect::results(&response))?;
    ctx.check(
        "every finding is Critical",
        expect::all_records_match(findings, "severity", SEVERITY),
    )
}

pub async fn product_exists(ctx: &TestContext) -> Result<()> {
    let response = ctx
        .step(
            "GET test product",
            ctx.api().list(
                PRODUCTS,
                Auth::Token(ctx.token()?),
                &[("name", TEST_PRODUCT_NAME)],
            ),
        )
        .await?;
    ctx.check("status is 200", expect::status(&response, 200))?;
    ctx.check("results is an array", expect::results(&response).map(|_| ()))
}
