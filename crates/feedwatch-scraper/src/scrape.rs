//! One bounded scrape pass over a feed page.
//!
//! A pass navigates to the feed, then repeatedly reads the rendered posts and
//! scrolls to load more. It stops at the first post older than the horizon
//! (the feed is newest-first), after `max_scrolls` iterations, or when the
//! wall-clock budget runs out. Page-level failures and budget breaches yield
//! an empty result; request blocking is always lifted before returning.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use feedwatch_core::{AppConfig, ScrapedPost};

use crate::browser::{ElementHandle, Page, ResourceKind};
use crate::error::ScraperError;
use crate::relative_time::{normalize_label, resolve_relative_time};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";
const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// CSS selectors and labels describing the feed's markup.
#[derive(Debug, Clone)]
pub struct FeedSelectors {
    pub post: String,
    pub author: String,
    pub content: String,
    pub timestamp: String,
    /// Attribute on the post element carrying its stable id.
    pub id_attribute: String,
    /// Text of the link that expands truncated posts.
    pub read_more_label: String,
    pub cookie_button_labels: Vec<String>,
    /// Path appended to the feed origin to build a permalink; `{id}` is
    /// replaced with the post id.
    pub permalink_path: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            post: r#"div[data-test="community-post"]"#.to_string(),
            author: r#"span[data-test="post-username"]"#.to_string(),
            content: "div.text".to_string(),
            timestamp: "span.tooltip".to_string(),
            id_attribute: "data-post-id".to_string(),
            read_more_label: "Read all".to_string(),
            cookie_button_labels: vec!["Accept".to_string(), "Allow all".to_string()],
            permalink_path: "/community/post/{id}".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Maximum post age.
    pub horizon: TimeDelta,
    /// Wall-clock budget for a whole pass.
    pub budget: Duration,
    pub navigation_timeout: Duration,
    pub operation_timeout: Duration,
    pub selector_timeout: Duration,
    pub max_scrolls: u32,
    pub scroll_pause: Duration,
    pub cookie_wait: Duration,
    pub cookie_settle: Duration,
    pub read_more_wait: Duration,
    pub read_more_settle: Duration,
    pub blocked_resources: Vec<ResourceKind>,
    pub selectors: FeedSelectors,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            horizon: TimeDelta::hours(24),
            budget: Duration::from_secs(150),
            navigation_timeout: Duration::from_millis(60_000),
            operation_timeout: Duration::from_millis(20_000),
            selector_timeout: Duration::from_millis(30_000),
            max_scrolls: 20,
            scroll_pause: Duration::from_millis(2_000),
            cookie_wait: Duration::from_millis(2_000),
            cookie_settle: Duration::from_millis(1_000),
            read_more_wait: Duration::from_millis(200),
            read_more_settle: Duration::from_millis(200),
            blocked_resources: ResourceKind::NON_ESSENTIAL.to_vec(),
            selectors: FeedSelectors::default(),
        }
    }
}

impl ScrapeSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            horizon: TimeDelta::hours(i64::from(config.horizon_hours)),
            budget: Duration::from_secs(config.scrape_budget_secs),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            selector_timeout: Duration::from_millis(config.selector_timeout_ms),
            max_scrolls: config.max_scrolls,
            scroll_pause: Duration::from_millis(config.scroll_pause_ms),
            ..Self::default()
        }
    }
}

/// Scrapes one feed URL with an already-open page.
#[async_trait]
pub trait FeedScraper: Send + Sync {
    async fn scrape(&self, page: &dyn Page, url: &str) -> Result<Vec<ScrapedPost>, ScraperError>;
}

/// [`FeedScraper`] running [`scrape_page`] with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct PageScraper {
    settings: ScrapeSettings,
}

impl PageScraper {
    #[must_use]
    pub fn new(settings: ScrapeSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }
}

#[async_trait]
impl FeedScraper for PageScraper {
    async fn scrape(&self, page: &dyn Page, url: &str) -> Result<Vec<ScrapedPost>, ScraperError> {
        Ok(scrape_page(page, url, &self.settings).await)
    }
}

/// Runs one pass against `url`.
///
/// Never fails: navigation errors, selector timeouts and budget breaches are
/// logged and produce an empty list, which callers treat as "no new posts".
pub async fn scrape_page(page: &dyn Page, url: &str, settings: &ScrapeSettings) -> Vec<ScrapedPost> {
    tracing::info!(url, "scraper: starting pass");

    let outcome = tokio::time::timeout(settings.budget, async {
        if let Err(e) = page
            .set_default_timeouts(settings.navigation_timeout, settings.operation_timeout)
            .await
        {
            tracing::debug!(url, error = %e, "scraper: could not set default timeouts");
        }
        if let Err(e) = page.block_resources(&settings.blocked_resources).await {
            tracing::warn!(url, error = %e, "scraper: resource blocking unavailable");
        }
        run_pass(page, url, settings).await
    })
    .await;

    // Lift blocking on every exit path, bounded so a wedged session cannot
    // hold the caller.
    match tokio::time::timeout(settings.operation_timeout, page.unblock_resources()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(url, error = %e, "scraper: failed to lift resource blocking"),
        Err(_) => tracing::debug!(url, "scraper: timed out lifting resource blocking"),
    }

    match outcome {
        Ok(Ok(posts)) => {
            tracing::info!(url, count = posts.len(), "scraper: pass complete");
            posts
        }
        Ok(Err(e)) => {
            tracing::error!(url, error = %e, "scraper: pass aborted");
            Vec::new()
        }
        Err(_) => {
            tracing::error!(
                url,
                budget_secs = settings.budget.as_secs(),
                "scraper: pass exceeded its time budget, skipping page"
            );
            Vec::new()
        }
    }
}

/// Per-pass bookkeeping.
#[derive(Debug, Default)]
struct PassState {
    seen: HashSet<String>,
    /// Set once the first post beyond the horizon is met; never reset.
    limit_reached: bool,
}

enum PostStep {
    Emit(ScrapedPost),
    Skip,
    BeyondHorizon { label: String },
}

async fn run_pass(
    page: &dyn Page,
    url: &str,
    settings: &ScrapeSettings,
) -> Result<Vec<ScrapedPost>, ScraperError> {
    let selectors = &settings.selectors;
    let permalink_base = feed_origin(url)?;

    page.goto(url, settings.navigation_timeout).await?;
    page.wait_for_selector(&selectors.post, settings.selector_timeout)
        .await?;
    dismiss_cookie_banner(page, settings).await;

    let cutoff = Utc::now()
        .checked_sub_signed(settings.horizon)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut state = PassState::default();
    let mut posts = Vec::new();

    for iteration in 0..settings.max_scrolls {
        let elements = page.query_selector_all(&selectors.post).await?;
        if elements.is_empty() && iteration == 0 {
            tracing::warn!(url, "scraper: no posts found on page");
            break;
        }
        tracing::debug!(url, iteration, rendered = elements.len(), "scraper: snapshot");

        for element in &elements {
            match extract_post(page, element, settings, cutoff, &permalink_base, &state).await {
                Ok(PostStep::Emit(post)) => {
                    state.seen.insert(post.unique_id.clone());
                    posts.push(post);
                }
                Ok(PostStep::Skip) => {}
                Ok(PostStep::BeyondHorizon { label }) => {
                    tracing::debug!(url, label = %label, "scraper: reached horizon, stopping");
                    state.limit_reached = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(url, error = %e, "scraper: skipping post");
                }
            }
        }

        if state.limit_reached {
            break;
        }

        page.evaluate(SCROLL_TO_BOTTOM).await?;
        tokio::time::sleep(settings.scroll_pause).await;
    }

    Ok(posts)
}

async fn extract_post(
    page: &dyn Page,
    element: &ElementHandle,
    settings: &ScrapeSettings,
    cutoff: DateTime<Utc>,
    permalink_base: &str,
    state: &PassState,
) -> Result<PostStep, ScraperError> {
    let selectors = &settings.selectors;

    let Some(post_id) = page
        .attribute(element, &selectors.id_attribute)
        .await?
        .filter(|id| !id.is_empty())
    else {
        return Ok(PostStep::Skip);
    };
    if state.seen.contains(&post_id) {
        return Ok(PostStep::Skip);
    }

    let label = match page.query_selector_in(element, &selectors.timestamp).await? {
        Some(el) => normalize_label(&page.inner_text(&el).await?),
        None => String::new(),
    };
    let posted_at = resolve_relative_time(&label, Utc::now());
    if posted_at < cutoff {
        return Ok(PostStep::BeyondHorizon { label });
    }

    expand_truncated(page, element, settings).await;

    let author = match page.query_selector_in(element, &selectors.author).await? {
        Some(el) => page.inner_text(&el).await?,
        None => "N/A".to_string(),
    };
    let body = match page.query_selector_in(element, &selectors.content).await? {
        Some(el) => page.inner_text(&el).await?,
        None => String::new(),
    };

    let url = format!(
        "{permalink_base}{}",
        selectors.permalink_path.replace("{id}", &post_id)
    );
    Ok(PostStep::Emit(ScrapedPost {
        unique_id: post_id,
        content: format!("{}: {}", author.trim(), body.trim()),
        posted_at,
        time_label: label,
        url,
    }))
}

/// Clicks the post's "read more" link if it shows up quickly. Failures are
/// ignored; the truncated text is still usable.
async fn expand_truncated(page: &dyn Page, element: &ElementHandle, settings: &ScrapeSettings) {
    let label = settings.selectors.read_more_label.as_str();
    let Ok(Some(link)) = page.find_by_text(Some(element), "*", &[label]).await else {
        return;
    };
    if wait_until_visible(page, &link, settings.read_more_wait).await
        && page.click(&link).await.is_ok()
    {
        tokio::time::sleep(settings.read_more_settle).await;
    }
}

async fn dismiss_cookie_banner(page: &dyn Page, settings: &ScrapeSettings) {
    let labels: Vec<&str> = settings
        .selectors
        .cookie_button_labels
        .iter()
        .map(String::as_str)
        .collect();

    let button = match page.find_by_text(None, "button", &labels).await {
        Ok(Some(button)) => button,
        Ok(None) => {
            tracing::debug!("scraper: no cookie banner");
            return;
        }
        Err(e) => {
            tracing::info!(error = %e, "scraper: cookie banner lookup failed");
            return;
        }
    };

    if !wait_until_visible(page, &button, settings.cookie_wait).await {
        return;
    }
    match page.click(&button).await {
        Ok(()) => tokio::time::sleep(settings.cookie_settle).await,
        Err(e) => tracing::info!(error = %e, "scraper: could not dismiss cookie banner"),
    }
}

/// Polls visibility until `timeout`; errors count as not visible.
async fn wait_until_visible(page: &dyn Page, element: &ElementHandle, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(true) = page.is_visible(element).await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
    }
}

/// `scheme://host[:port]` of the feed URL, used as the permalink base.
fn feed_origin(url: &str) -> Result<String, ScraperError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(ScraperError::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no origin".to_string(),
        });
    }
    Ok(origin.ascii_serialization())
}

#[cfg(test)]
#[path = "scrape_test.rs"]
mod tests;
