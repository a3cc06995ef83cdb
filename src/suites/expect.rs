//! Assertions on response snapshots and page state

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::browser::{BrowserSession, ElementRef, Locator};
use crate::http::HttpResponse;

/// Observed state did not match the expectation
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Assertion failed: {0}")]
pub struct AssertionError(pub String);

pub type Check<T = ()> = std::result::Result<T, AssertionError>;

fn fail<T>(message: impl Into<String>) -> Check<T> {
    Err(AssertionError(message.into()))
}

/// Compile a literal pattern used by a check
pub fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).with_context(|| format!("Invalid pattern {re}"))
}

pub fn status(response: &HttpResponse, expected: u16) -> Check {
    if response.status_code == expected {
        Ok(())
    } else {
        fail(format!(
            "expected status {expected}, got {}",
            response.status_code
        ))
    }
}

pub fn status_in(response: &HttpResponse, allowed: &[u16]) -> Check {
    if allowed.contains(&response.status_code) {
        Ok(())
    } else {
        fail(format!(
            "expected status in {allowed:?}, got {}",
            response.status_code
        ))
    }
}

pub fn header_contains(response: &HttpResponse, name: &str, needle: &str) -> Check {
    match response.get_header(name) {
        Some(value) if value.contains(needle) => Ok(()),
        Some(value) => fail(format!("header {name} is '{value}', expected it to contain '{needle}'")),
        None => fail(format!("header {name} missing")),
    }
}

/// Every key must be present in the JSON body
pub fn fields(response: &HttpResponse, keys: &[&str]) -> Check {
    let Some(body) = response.json.as_ref() else {
        return fail("response body is not JSON");
    };
    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| body.get(*k).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        fail(format!("response body is missing {missing:?}"))
    }
}

/// The `results` field exists and is an ordered sequence
pub fn results(response: &HttpResponse) -> Check<&Vec<Value>> {
    match response.field("results") {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => fail(format!("`results` is not an array: {other}")),
        None => fail("response body has no `results`"),
    }
}

/// The `count` field exists and is a non-negative integer
pub fn count(response: &HttpResponse) -> Check<u64> {
    match response.field("count") {
        Some(value) => value
            .as_u64()
            .ok_or_else(|| AssertionError(format!("`count` is not a non-negative integer: {value}"))),
        None => fail("response body has no `count`"),
    }
}

pub fn at_least(actual: u64, minimum: u64, what: &str) -> Check {
    if actual >= minimum {
        Ok(())
    } else {
        fail(format!("{what} dropped from {minimum} to {actual}"))
    }
}

pub fn faster_than(duration_ms: u64, limit_ms: u64) -> Check {
    if duration_ms < limit_ms {
        Ok(())
    } else {
        fail(format!("took {duration_ms}ms, limit is {limit_ms}ms"))
    }
}

/// Every record's `field` equals `expected` literally
pub fn all_records_match(records: &[Value], field: &str, expected: &str) -> Check {
    for (i, record) in records.iter().enumerate() {
        let actual = record.get(field).and_then(Value::as_str);
        if actual != Some(expected) {
            return fail(format!(
                "record {i} has {field}={actual:?}, expected {expected:?}"
            ));
        }
    }
    Ok(())
}

pub fn record_fields(record: &Value, keys: &[&str]) -> Check {
    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| record.get(*k).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        fail(format!("record is missing {missing:?}"))
    }
}

pub fn non_empty_string(response: &HttpResponse, key: &str) -> Check {
    match response.field(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(()),
        _ => fail(format!("`{key}` is missing or empty")),
    }
}

/// Wait for the page URL to match (or stop matching) a pattern
pub async fn url(session: &BrowserSession, pattern: &Regex, should_match: bool) -> Result<()> {
    let (met, last) = session.wait_for_url(pattern, should_match).await?;
    if met {
        Ok(())
    } else {
        let verb = if should_match { "match" } else { "not match" };
        Err(AssertionError(format!("expected URL to {verb} /{pattern}/, last was {last}")).into())
    }
}

/// Wait for an element to become visible
pub async fn visible(session: &BrowserSession, locator: &Locator) -> Result<ElementRef> {
    match locator
        .wait_visible(session, session.expect_timeout())
        .await?
    {
        Some(element) => Ok(element),
        None => Err(AssertionError(format!("expected {locator} to be visible")).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn response(status_code: u16, json: Value) -> HttpResponse {
        HttpResponse {
            status_code,
            headers: HashMap::new(),
            body: json.to_string(),
            json: Some(json),
            duration_ms: 5,
        }
    }

    #[test]
    fn test_status_checks() {
        let resp = response(401, json!({"detail": "Authentication credentials were not provided."}));
        assert!(status(&resp, 401).is_ok());
        assert_eq!(
            status(&resp, 200),
            Err(AssertionError("expected status 200, got 401".into()))
        );
        assert!(status_in(&response(302, json!({})), &[200, 301, 302]).is_ok());
        assert!(status_in(&response(500, json!({})), &[200, 301, 302]).is_err());
    }

    #[test]
    fn test_field_presence() {
        let root = response(
            200,
            json!({"products": "/p", "engagements": "/e", "findings": "/f"}),
        );
        assert!(fields(&root, &["products", "engagements", "findings"]).is_ok());
        let err = fields(&root, &["products", "tests"]).unwrap_err();
        assert!(err.0.contains("tests"));
    }

    #[test]
    fn test_results_and_count() {
        let listing = response(200, json!({"count": 2, "results": [{"id": 1}, {"id": 2}]}));
        assert_eq!(results(&listing).unwrap().len(), 2);
        assert_eq!(count(&listing), Ok(2));

        let bad = response(200, json!({"count": -1, "results": {}}));
        assert!(results(&bad).is_err());
        assert!(count(&bad).is_err());
    }

    #[test]
    fn test_severity_filter() {
        let records = vec![
            json!({"severity": "Critical"}),
            json!({"severity": "Critical"}),
        ];
        assert!(all_records_match(&records, "severity", "Critical").is_ok());

        let mixed = vec![json!({"severity": "Critical"}), json!({"severity": "High"})];
        assert!(all_records_match(&mixed, "severity", "Critical").is_err());
        assert!(all_records_match(&[], "severity", "Critical").is_ok());
    }

    #[test]
    fn test_counts_and_latency() {
        assert!(at_least(5, 5, "finding count").is_ok());
        assert!(at_least(4, 5, "finding count").is_err());
        assert!(faster_than(4999, 5000).is_ok());
        assert!(faster_than(5000, 5000).is_err());
    }

    #[test]
    fn test_token_field() {
        assert!(non_empty_string(&response(200, json!({"token": "abc"})), "token").is_ok());
        assert!(non_empty_string(&response(200, json!({"token": ""})), "token").is_err());
    }
}
