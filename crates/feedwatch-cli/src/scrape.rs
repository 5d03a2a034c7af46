//! One-off scrape of a single subject's feed.

use std::time::Duration;

use chrono::TimeDelta;
use feedwatch_core::ScrapedPost;
use feedwatch_scraper::{scrape_page, Browser, BrowserLauncher, ScrapeSettings, WebDriverLauncher};

use crate::ScrapeArgs;

/// Scrapes `args.subject` with a fresh browser session and writes the posts
/// as pretty JSON.
///
/// # Errors
///
/// Returns an error if the browser session cannot be opened or the output
/// cannot be written. A pass that fails after navigation yields `[]`.
pub(crate) async fn run_scrape(args: &ScrapeArgs) -> anyhow::Result<()> {
    let subject = args.subject.trim();
    anyhow::ensure!(!subject.is_empty(), "subject must not be empty");

    let url = feedwatch_pipeline::subject_url(&args.feed_url_template, subject);
    let settings = ScrapeSettings {
        horizon: TimeDelta::hours(i64::from(args.hours)),
        ..ScrapeSettings::default()
    };
    let launcher = WebDriverLauncher::new(
        &args.webdriver_url,
        !args.headed,
        settings.navigation_timeout,
    )?;

    let posts = scrape_once(&launcher, &args.user_agent, &url, &settings).await?;
    let json = serde_json::to_string_pretty(&posts)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            eprintln!("wrote {} posts to {}", posts.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn scrape_once(
    launcher: &dyn BrowserLauncher,
    user_agent: &str,
    url: &str,
    settings: &ScrapeSettings,
) -> anyhow::Result<Vec<ScrapedPost>> {
    let started = std::time::Instant::now();
    let browser = launcher.launch(user_agent).await?;

    let result = match browser.new_page().await {
        Ok(page) => {
            let posts = scrape_page(page.as_ref(), url, settings).await;
            if let Err(e) = page.close().await {
                tracing::warn!(error = %e, "scrape: failed to close page");
            }
            Ok(posts)
        }
        Err(e) => Err(e.into()),
    };
    close(browser.as_ref()).await;

    if let Ok(posts) = &result {
        tracing::info!(
            url,
            posts = posts.len(),
            elapsed_ms = elapsed_ms(started.elapsed()),
            "scrape: pass finished"
        );
    }
    result
}

async fn close(browser: &dyn Browser) {
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "scrape: failed to close browser");
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
