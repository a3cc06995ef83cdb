//! WebDriver session client
//!
//! Speaks the W3C WebDriver wire protocol (JSON over HTTP) to a running
//! driver server such as chromedriver, geckodriver, or Selenium.

use base64::Engine;
use regex::Regex;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use crate::config::BrowserConfig;

/// JSON key identifying a web element reference
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver key code for Enter
const ENTER_KEY: &str = "\u{E007}";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet period after which the page counts as network idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Browser driver errors
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("WebDriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    #[error("WebDriver transport error: {0}")]
    Transport(String),

    #[error("Unexpected WebDriver response: {0}")]
    Malformed(String),
}

impl BrowserError {
    fn is_stale(&self) -> bool {
        matches!(self, BrowserError::Protocol { error, .. } if error == "stale element reference")
    }
}

/// Opaque reference to an element in the current page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Result<Self, BrowserError> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| BrowserError::Malformed(format!("not an element: {value}")))
    }
}

/// Browser cookie as reported by the driver
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Session capabilities for the configured browser
pub fn capabilities(config: &BrowserConfig) -> Value {
    let window = format!("--window-size={},{}", config.viewport_width, config.viewport_height);
    let mut always_match = json!({
        "browserName": config.browser_name,
        "acceptInsecureCerts": config.accept_insecure_certs,
    });

    match config.browser_name.as_str() {
        "chrome" | "chromium" => {
            let mut args = vec![window];
            if config.headless {
                args.push("--headless=new".to_string());
            }
            always_match["goog:chromeOptions"] = json!({ "args": args });
        }
        "firefox" => {
            let args: Vec<&str> = if config.headless { vec!["-headless"] } else { vec![] };
            always_match["moz:firefoxOptions"] = json!({ "args": args });
        }
        _ => {}
    }

    json!({ "capabilities": { "alwaysMatch": always_match } })
}

/// One isolated browser session
pub struct BrowserSession {
    http: Client,
    endpoint: String,
    session_id: String,
    base_url: String,
    expect_timeout: Duration,
}

impl BrowserSession {
    /// Open a new session on the driver at `endpoint`
    pub async fn start(
        endpoint: &str,
        config: &BrowserConfig,
        base_url: &str,
        expect_timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let http = Client::builder()
            .build()
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let value = send(
            &http,
            Method::POST,
            &format!("{endpoint}/session"),
            Some(capabilities(config)),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Malformed(format!("no sessionId in {value}")))?
            .to_string();

        debug!("Started WebDriver session {}", session_id);

        let session = Self {
            http,
            endpoint,
            session_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            expect_timeout,
        };

        session
            .command(
                Method::POST,
                "/window/rect",
                Some(json!({
                    "width": config.viewport_width,
                    "height": config.viewport_height,
                })),
            )
            .await?;

        Ok(session)
    }

    pub fn expect_timeout(&self) -> Duration {
        self.expect_timeout
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        send(&self.http, method, &url, body).await
    }

    /// Navigate to a path relative to the base URL (or an absolute URL)
    pub async fn goto(&self, path: &str) -> Result<(), BrowserError> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        debug!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    pub async fn current_url(&self) -> Result<String, BrowserError> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Malformed(format!("url was {value}")))
    }

    /// Find all elements matching a locator strategy
    pub async fn find_all(&self, using: &str, value: &str) -> Result<Vec<ElementRef>, BrowserError> {
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        elements_from(&found)
    }

    /// Find descendants of an element
    pub async fn find_children(
        &self,
        parent: &ElementRef,
        using: &str,
        value: &str,
    ) -> Result<Vec<ElementRef>, BrowserError> {
        let found = self
            .command(
                Method::POST,
                &format!("/element/{}/elements", parent.id()),
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        elements_from(&found)
    }

    /// Whether the element is rendered; stale references count as hidden
    pub async fn is_displayed(&self, element: &ElementRef) -> Result<bool, BrowserError> {
        match self
            .command(Method::GET, &format!("/element/{}/displayed", element.id()), None)
            .await
        {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(e) if e.is_stale() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), BrowserError> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    pub async fn clear(&self, element: &ElementRef) -> Result<(), BrowserError> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.id()),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), BrowserError> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    /// Replace the element's value
    pub async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), BrowserError> {
        self.clear(element).await?;
        self.send_keys(element, text).await
    }

    pub async fn press_enter(&self, element: &ElementRef) -> Result<(), BrowserError> {
        self.send_keys(element, ENTER_KEY).await
    }

    pub async fn text(&self, element: &ElementRef) -> Result<String, BrowserError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Click the first `<option>` whose label matches
    pub async fn select_option(
        &self,
        select: &ElementRef,
        label: &Regex,
    ) -> Result<bool, BrowserError> {
        for option in self.find_children(select, "css selector", "option").await? {
            if label.is_match(&self.text(&option).await?) {
                self.click(&option).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        let value = self.command(Method::GET, "/cookie", None).await?;
        serde_json::from_value(value).map_err(|e| BrowserError::Malformed(e.to_string()))
    }

    pub async fn delete_cookies(&self) -> Result<(), BrowserError> {
        self.command(Method::DELETE, "/cookie", None).await.map(|_| ())
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    /// PNG screenshot of the current viewport
    pub async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::Malformed("screenshot was not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::Malformed(e.to_string()))
    }

    /// Poll the current URL until it does (or does not) match `pattern`
    ///
    /// Returns whether the expectation was met and the last URL observed.
    pub async fn wait_for_url(
        &self,
        pattern: &Regex,
        should_match: bool,
    ) -> Result<(bool, String), BrowserError> {
        let deadline = Instant::now() + self.expect_timeout;
        loop {
            let url = self.current_url().await?;
            if pattern.is_match(&url) == should_match {
                return Ok((true, url));
            }
            if Instant::now() >= deadline {
                return Ok((false, url));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until the document is loaded and no new resources were fetched
    /// for a short quiet window
    pub async fn wait_for_network_idle(&self) -> Result<(), BrowserError> {
        let deadline = Instant::now() + self.expect_timeout;
        let mut last_count: Option<u64> = None;
        let mut quiet_since = Instant::now();

        loop {
            let state = self
                .execute(
                    "return [document.readyState, performance.getEntriesByType('resource').length];",
                    vec![],
                )
                .await?;
            let ready = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64);

            if !ready || count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(
                    self.expect_timeout,
                    "network idle".to_string(),
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// End the session
    pub async fn quit(self) -> Result<(), BrowserError> {
        debug!("Closing WebDriver session {}", self.session_id);
        self.command(Method::DELETE, "", None).await.map(|_| ())
    }
}

fn elements_from(value: &Value) -> Result<Vec<ElementRef>, BrowserError> {
    value
        .as_array()
        .ok_or_else(|| BrowserError::Malformed(format!("expected element list, got {value}")))?
        .iter()
        .map(ElementRef::from_value)
        .collect()
}

/// Send one WebDriver command and unwrap its `value`
async fn send(
    http: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, BrowserError> {
    debug!("WebDriver {} {}", method, url);

    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| BrowserError::Transport(e.to_string()))?;
    let payload: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::Malformed(e.to_string()))?;

    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(BrowserError::Protocol {
            error: error.to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    Ok(value)
}
