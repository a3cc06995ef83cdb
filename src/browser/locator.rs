//! Element locators
//!
//! A [`Locator`] is an ordered fallback chain of selector strategies. Page
//! markup differs between DefectDojo releases, so lookups try each strategy
//! in turn and take the first element that is actually displayed.

use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use super::driver::{BrowserError, BrowserSession, ElementRef};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A single lookup strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    /// WebDriver strategy name
    pub fn using(&self) -> &'static str {
        match self {
            Selector::Css(_) => "css selector",
            Selector::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Selector::Css(v) | Selector::XPath(v) => v,
        }
    }

    /// Interactive element whose text contains `text`, ignoring case
    pub fn text(text: &str) -> Self {
        let needle = text.to_lowercase().replace('\'', "");
        Selector::XPath(format!(
            "//*[self::a or self::button or self::input or @role='button' or @role='menuitem']\
             [contains(translate(normalize-space(string(.)), \
             'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '{needle}')]"
        ))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(v) => write!(f, "{v}"),
            Selector::XPath(v) => write!(f, "xpath={v}"),
        }
    }
}

/// Prioritised list of selectors for one logical element
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    strategies: Vec<Selector>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            strategies: vec![Selector::Css(selector.into())],
        }
    }

    /// Chain of CSS selectors tried in order
    pub fn any_css(selectors: &[&str]) -> Self {
        Self {
            strategies: selectors
                .iter()
                .map(|s| Selector::Css(s.to_string()))
                .collect(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            strategies: vec![Selector::text(text)],
        }
    }

    pub fn or(mut self, selector: Selector) -> Self {
        self.strategies.push(selector);
        self
    }

    /// First displayed match across all strategies, checked once
    pub async fn first_visible(
        &self,
        session: &BrowserSession,
    ) -> Result<Option<ElementRef>, BrowserError> {
        for selector in &self.strategies {
            let candidates = match session.find_all(selector.using(), selector.value()).await {
                Ok(found) => found,
                // An invalid selector for this page's engine is just a miss
                Err(BrowserError::Protocol { error, .. }) if error == "invalid selector" => {
                    continue
                }
                Err(e) => return Err(e),
            };

            for element in candidates {
                if session.is_displayed(&element).await? {
                    return Ok(Some(element));
                }
            }
        }
        Ok(None)
    }

    /// Poll until a match is displayed or `timeout` elapses
    pub async fn wait_visible(
        &self,
        session: &BrowserSession,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.first_visible(session).await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.strategies.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}
