//! [`BrowserLauncher`] over the W3C WebDriver protocol (chromedriver).
//!
//! Each launch creates a new WebDriver session, which chromedriver backs with
//! a fresh Chrome profile, so concurrent executions never share cookies or
//! history. Request blocking goes through chromedriver's DevTools passthrough
//! (`goog/cdp/execute`).

mod page;
mod session;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::browser::{Browser, BrowserLauncher};
use crate::error::ScraperError;

pub use page::WebDriverPage;
pub use session::WebDriverBrowser;

use session::{decode_response, Session};

/// Key under which WebDriver serializes element references.
pub(crate) const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735d466ecf";

pub struct WebDriverLauncher {
    http: Client,
    base_url: String,
    headless: bool,
    command_timeout: Duration,
}

impl WebDriverLauncher {
    /// Creates a launcher for the chromedriver listening at `base_url`.
    ///
    /// `command_timeout` bounds every WebDriver command until a page sets its
    /// own defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        headless: bool,
        command_timeout: Duration,
    ) -> Result<Self, ScraperError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            headless,
            command_timeout,
        })
    }
}

/// New-session capabilities: Chrome with DOMContentLoaded navigation and the
/// requested client identity.
pub(crate) fn session_capabilities(user_agent: &str, headless: bool) -> Value {
    let mut args = vec![
        format!("--user-agent={user_agent}"),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--window-size=1920,1080".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "pageLoadStrategy": "eager",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn Browser>, ScraperError> {
        let response = self
            .http
            .post(format!("{}/session", self.base_url))
            .timeout(self.command_timeout)
            .json(&session_capabilities(user_agent, self.headless))
            .send()
            .await?;
        let value = decode_response(response, "new session").await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScraperError::UnexpectedResponse {
                context: "new session (missing sessionId)".to_string(),
            })?;

        tracing::debug!(session_id, "webdriver: session created");
        Ok(Box::new(WebDriverBrowser::new(Session {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            id: session_id.to_string(),
            default_timeout: self.command_timeout,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_carry_user_agent_and_eager_loading() {
        let caps = session_capabilities("Agent/1.0", true);
        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["pageLoadStrategy"], "eager");
        let args: Vec<&str> = always["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(args.contains(&"--user-agent=Agent/1.0"));
        assert!(args.contains(&"--headless=new"));
    }

    #[test]
    fn headed_sessions_omit_headless_flag() {
        let caps = session_capabilities("Agent/1.0", false);
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .clone();
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let launcher =
            WebDriverLauncher::new("http://localhost:9515/", true, Duration::from_secs(5)).unwrap();
        assert_eq!(launcher.base_url, "http://localhost:9515");
    }
}
