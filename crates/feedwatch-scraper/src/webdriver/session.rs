use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde_json::{json, Value};

use crate::browser::{Browser, Page};
use crate::error::ScraperError;

use super::page::WebDriverPage;

/// Addressing for one WebDriver session.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) id: String,
    pub(crate) default_timeout: Duration,
}

impl Session {
    /// Sends one command to `/session/{id}{path}` and returns the `value`
    /// member of the response.
    pub(crate) async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, ScraperError> {
        let url = format!("{}/session/{}{}", self.base_url, self.id, path);
        let mut request = self.http.request(method, &url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        decode_response(response, path).await
    }
}

/// Unwraps a WebDriver response envelope.
///
/// Error responses carry `{"value": {"error": ..., "message": ...}}` and are
/// mapped to [`ScraperError::WebDriver`].
pub(crate) async fn decode_response(
    response: Response,
    context: &str,
) -> Result<Value, ScraperError> {
    let status = response.status();
    let mut body: Value = response.json().await?;
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| format!("{context} returned {status}"), str::to_owned);
        return Err(ScraperError::WebDriver { error, message });
    }

    Ok(value)
}

pub struct WebDriverBrowser {
    session: Session,
}

impl WebDriverBrowser {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session.id
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    /// Opens a new tab and makes it the session's current window.
    async fn new_page(&self) -> Result<Box<dyn Page>, ScraperError> {
        let timeout = self.session.default_timeout;
        let created = self
            .session
            .command(
                Method::POST,
                "/window/new",
                Some(json!({ "type": "tab" })),
                timeout,
            )
            .await?;
        let handle = created
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| ScraperError::UnexpectedResponse {
                context: "new window (missing handle)".to_string(),
            })?
            .to_string();

        self.session
            .command(
                Method::POST,
                "/window",
                Some(json!({ "handle": handle })),
                timeout,
            )
            .await?;

        Ok(Box::new(WebDriverPage::new(self.session.clone(), handle)))
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.session
            .command(Method::DELETE, "", None, self.session.default_timeout)
            .await?;
        tracing::debug!(session_id = %self.session.id, "webdriver: session closed");
        Ok(())
    }
}
