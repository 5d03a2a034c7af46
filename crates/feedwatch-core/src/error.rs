use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid cron expression \"{expression}\": {reason}")]
    InvalidCron { expression: String, reason: String },
}

/// Errors surfaced by a [`crate::TaskStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scrape task {0} not found")]
    TaskNotFound(i64),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by a [`crate::Summarizer`] implementation.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summarizer is not configured: {0}")]
    NotConfigured(String),

    #[error("summarizer request failed: {0}")]
    Request(String),

    #[error("summarizer returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("summarizer returned no content")]
    Empty,
}

/// Errors surfaced by a [`crate::Notifier`] implementation.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid delivery target {0:?}")]
    InvalidTarget(String),

    #[error("delivery request failed: {0}")]
    Request(String),

    #[error("delivery rejected (status {status}): {description}")]
    Rejected { status: u16, description: String },
}
