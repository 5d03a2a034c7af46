//! Seams to the collaborators the execution core depends on.
//!
//! Each trait is object safe so the executor and the coordinator can hold
//! `Arc<dyn ...>` handles and tests can substitute in-memory fakes.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{DeliveryError, StoreError, SummaryError};
use crate::task::ScrapeTask;

/// Persistence of tasks and processed-post markers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Looks up one task by id.
    async fn get_task(&self, task_id: i64) -> Result<Option<ScrapeTask>, StoreError>;

    /// Returns every task with `is_enabled = true`.
    async fn list_enabled_tasks(&self) -> Result<Vec<ScrapeTask>, StoreError>;

    /// Returns the ids of all posts already delivered for `task_id`.
    async fn processed_post_ids(&self, task_id: i64) -> Result<HashSet<String>, StoreError>;

    /// Writes one processed marker per id and sets `last_run_at`, atomically.
    ///
    /// Ids that are already marked are ignored. Returns the number of
    /// markers actually inserted.
    async fn record_run(
        &self,
        task_id: i64,
        post_ids: &[String],
        ran_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// AI summarization of a bundle of new posts.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str, prompt: &str, model: &str)
        -> Result<String, SummaryError>;
}

/// Delivery of a text message to a sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, sink: &str, text: &str) -> Result<(), DeliveryError>;
}
