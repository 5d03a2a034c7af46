use feedwatch_core::{ConfigError, DeliveryError, StoreError, SummaryError};
use feedwatch_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("browser error: {0}")]
    Browser(#[from] ScraperError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("summarizer setup failed: {0}")]
    Summarizer(#[from] SummaryError),

    #[error("notifier setup failed: {0}")]
    Notifier(#[from] DeliveryError),

    #[error("scrape pass panicked: {0}")]
    Panicked(String),
}
