use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::browser::{ElementHandle, Page, ResourceKind};
use crate::error::ScraperError;

use super::session::Session;
use super::ELEMENT_KEY;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct WebDriverPage {
    session: Session,
    window: String,
    operation_timeout_ms: AtomicU64,
}

impl WebDriverPage {
    pub(crate) fn new(session: Session, window: String) -> Self {
        let operation_timeout_ms =
            u64::try_from(session.default_timeout.as_millis()).unwrap_or(u64::MAX);
        Self {
            session,
            window,
            operation_timeout_ms: AtomicU64::new(operation_timeout_ms),
        }
    }

    #[must_use]
    pub fn window_handle(&self) -> &str {
        &self.window
    }

    fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.load(Ordering::Relaxed))
    }

    async fn get(&self, path: &str) -> Result<Value, ScraperError> {
        self.session
            .command(Method::GET, path, None, self.operation_timeout())
            .await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ScraperError> {
        self.session
            .command(Method::POST, path, Some(body), self.operation_timeout())
            .await
    }

    async fn cdp(&self, cmd: &str, params: Value) -> Result<Value, ScraperError> {
        self.post("/goog/cdp/execute", json!({ "cmd": cmd, "params": params }))
            .await
    }

    async fn find_elements(
        &self,
        scope: Option<&ElementHandle>,
        using: &str,
        value: &str,
    ) -> Result<Vec<ElementHandle>, ScraperError> {
        let path = match scope {
            Some(el) => format!("/element/{}/elements", el.id()),
            None => "/elements".to_string(),
        };
        let found = self
            .post(&path, json!({ "using": using, "value": value }))
            .await?;
        Ok(parse_elements(&found))
    }
}

/// Extracts element references from a find-elements result.
fn parse_elements(value: &Value) -> Vec<ElementHandle> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                .map(|id| ElementHandle(id.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Quotes `text` as an XPath string literal.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// XPath selecting `tag` elements whose own text contains any of `labels`.
fn text_xpath(scoped: bool, tag: &str, labels: &[&str]) -> String {
    let predicate = labels
        .iter()
        .map(|label| format!("contains(normalize-space(.), {})", xpath_literal(label)))
        .collect::<Vec<_>>()
        .join(" or ");
    let prefix = if scoped { "." } else { "" };
    format!("{prefix}//{tag}[text()[{predicate}]]")
}

fn blocked_url_patterns(kinds: &[ResourceKind]) -> Vec<&'static str> {
    kinds
        .iter()
        .flat_map(|kind| kind.url_patterns().iter().copied())
        .collect()
}

#[async_trait]
impl Page for WebDriverPage {
    async fn set_default_timeouts(
        &self,
        navigation: Duration,
        operation: Duration,
    ) -> Result<(), ScraperError> {
        let operation_ms = u64::try_from(operation.as_millis()).unwrap_or(u64::MAX);
        self.operation_timeout_ms
            .store(operation_ms, Ordering::Relaxed);
        self.post(
            "/timeouts",
            json!({
                "pageLoad": u64::try_from(navigation.as_millis()).unwrap_or(u64::MAX),
                "script": operation_ms,
                "implicit": 0
            }),
        )
        .await?;
        Ok(())
    }

    async fn block_resources(&self, kinds: &[ResourceKind]) -> Result<(), ScraperError> {
        self.cdp("Network.enable", json!({})).await?;
        self.cdp(
            "Network.setBlockedURLs",
            json!({ "urls": blocked_url_patterns(kinds) }),
        )
        .await?;
        Ok(())
    }

    async fn unblock_resources(&self) -> Result<(), ScraperError> {
        self.cdp("Network.setBlockedURLs", json!({ "urls": [] }))
            .await?;
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        self.session
            .command(Method::POST, "/url", Some(json!({ "url": url })), timeout)
            .await?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.query_selector_all(selector).await?.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::Timeout {
                    what: format!("selector {selector}"),
                    timeout_ms: timeout.as_millis(),
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, ScraperError> {
        self.find_elements(None, "css selector", selector).await
    }

    async fn query_selector_in(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, ScraperError> {
        let found = self
            .find_elements(Some(scope), "css selector", selector)
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_by_text(
        &self,
        scope: Option<&ElementHandle>,
        tag: &str,
        labels: &[&str],
    ) -> Result<Option<ElementHandle>, ScraperError> {
        let xpath = text_xpath(scope.is_some(), tag, labels);
        let found = self.find_elements(scope, "xpath", &xpath).await?;
        Ok(found.into_iter().next())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        let value = self
            .get(&format!("/element/{}/attribute/{name}", element.id()))
            .await?;
        Ok(value.as_str().map(str::to_owned))
    }

    async fn inner_text(&self, element: &ElementHandle) -> Result<String, ScraperError> {
        let value = self.get(&format!("/element/{}/text", element.id())).await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ScraperError::UnexpectedResponse {
                context: format!("text of element {}", element.id()),
            })
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, ScraperError> {
        let value = self
            .get(&format!("/element/{}/displayed", element.id()))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), ScraperError> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ScraperError> {
        self.post("/execute/sync", json!({ "script": script, "args": [] }))
            .await
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.session
            .command(Method::DELETE, "/window", None, self.operation_timeout())
            .await?;
        Ok(())
    }
}
