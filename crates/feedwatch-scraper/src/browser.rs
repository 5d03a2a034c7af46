//! Browser automation seams.
//!
//! The scraper only needs a small slice of a browser: navigation, element
//! queries, text reads, clicks, script evaluation and request blocking.
//! [`crate::webdriver`] implements these over chromedriver; tests drive the
//! scraper with scripted fakes.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

/// Opaque reference to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Categories of sub-resources that can be blocked while scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Stylesheet,
    Font,
}

impl ResourceKind {
    /// Every category that is not needed to read post text.
    pub const NON_ESSENTIAL: [ResourceKind; 3] =
        [ResourceKind::Image, ResourceKind::Stylesheet, ResourceKind::Font];

    /// URL patterns matching requests of this kind.
    #[must_use]
    pub fn url_patterns(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Image => &[
                "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.avif",
            ],
            ResourceKind::Stylesheet => &["*.css"],
            ResourceKind::Font => &["*.woff", "*.woff2", "*.ttf", "*.otf", "*.eot"],
        }
    }
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Starts a fresh, isolated session presenting `user_agent`.
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn Browser>, ScraperError>;
}

/// One running browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, ScraperError>;

    /// Ends the session. Pages opened from it become unusable.
    async fn close(&self) -> Result<(), ScraperError>;
}

/// A tab within a [`Browser`] session.
#[async_trait]
pub trait Page: Send + Sync {
    /// Sets the navigation timeout and the timeout applied to every other
    /// command.
    async fn set_default_timeouts(
        &self,
        navigation: Duration,
        operation: Duration,
    ) -> Result<(), ScraperError>;

    /// Blocks requests of the given kinds until [`Page::unblock_resources`].
    async fn block_resources(&self, kinds: &[ResourceKind]) -> Result<(), ScraperError>;

    async fn unblock_resources(&self) -> Result<(), ScraperError>;

    /// Navigates and waits for the DOM to be parsed.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// Waits until at least one element matches `selector`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), ScraperError>;

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, ScraperError>;

    /// First descendant of `scope` matching `selector`.
    async fn query_selector_in(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, ScraperError>;

    /// First element whose visible text contains any of `labels`, searched
    /// under `scope` or across the whole page when `scope` is `None`.
    ///
    /// `tag` restricts the match to one element name (`"button"`), or `"*"`.
    async fn find_by_text(
        &self,
        scope: Option<&ElementHandle>,
        tag: &str,
        labels: &[&str],
    ) -> Result<Option<ElementHandle>, ScraperError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ScraperError>;

    async fn inner_text(&self, element: &ElementHandle) -> Result<String, ScraperError>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, ScraperError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), ScraperError>;

    /// Runs `script` in the page and returns its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    async fn close(&self) -> Result<(), ScraperError>;
}
