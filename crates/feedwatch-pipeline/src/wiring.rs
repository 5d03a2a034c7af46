//! Builds a production [`TaskExecutor`] from application config.

use std::sync::Arc;
use std::time::Duration;

use feedwatch_core::{AppConfig, ConfigError, TaskStore};
use feedwatch_notify::{OpenAiSummarizer, TelegramNotifier};
use feedwatch_scraper::{PageScraper, ScrapeSettings, WebDriverLauncher};

use crate::error::ExecutionError;
use crate::executor::{ExecutorSettings, TaskExecutor};

const SUMMARY_TIMEOUT: Duration = Duration::from_secs(120);
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Wires WebDriver, OpenAI, and Telegram adapters around `store`.
///
/// # Errors
///
/// Returns [`ExecutionError::Config`] if `TELEGRAM_BOT_TOKEN` is unset, or
/// an adapter error if an HTTP client cannot be built.
pub fn build_executor(
    config: &AppConfig,
    store: Arc<dyn TaskStore>,
) -> Result<TaskExecutor, ExecutionError> {
    let token = config
        .telegram_bot_token
        .as_deref()
        .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;

    let launcher = WebDriverLauncher::new(
        &config.webdriver_url,
        config.browser_headless,
        Duration::from_millis(config.navigation_timeout_ms),
    )?;
    let scraper = PageScraper::new(ScrapeSettings::from_app_config(config));
    let summarizer = OpenAiSummarizer::new(
        &config.ai_base_url,
        config.openai_api_key.clone(),
        SUMMARY_TIMEOUT,
    )?;
    let notifier = TelegramNotifier::new(&config.telegram_api_url, token, DELIVERY_TIMEOUT)?;

    if config.openai_api_key.is_none() {
        tracing::warn!("wiring: OPENAI_API_KEY unset; deliveries will use the fallback message");
    }

    Ok(TaskExecutor::new(
        store,
        Arc::new(launcher),
        Arc::new(scraper),
        Arc::new(summarizer),
        Arc::new(notifier),
        ExecutorSettings {
            feed_url_template: config.feed_url_template.clone(),
            user_agent: config.user_agent.clone(),
        },
    ))
}
