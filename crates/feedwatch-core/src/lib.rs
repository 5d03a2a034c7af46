//! Shared domain types, capability traits, and configuration for feedwatch.

pub mod app_config;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod post;
pub mod schedule;
pub mod task;

pub use app_config::{AppConfig, Environment};
pub use capabilities::{Notifier, Summarizer, TaskStore};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError, DeliveryError, StoreError, SummaryError};
pub use post::ScrapedPost;
pub use schedule::CronSchedule;
pub use task::{ProcessedPostRecord, ScrapeTask};
