use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured recurring scrape-and-summarize job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub id: i64,
    /// Chat id of the user that owns the task; failure notices go here.
    pub owner_id: i64,
    pub name: String,
    /// Feed subjects in scrape order (e.g. coin slugs).
    pub subjects: Vec<String>,
    /// Five-field cron expression, validated before it is stored.
    pub schedule: String,
    pub is_enabled: bool,
    /// Delivery sink identifier (a chat or channel id).
    pub target_sink: Option<String>,
    pub ai_model: Option<String>,
    pub summary_prompt: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ScrapeTask {
    /// Subjects with surrounding whitespace removed; blank entries are dropped.
    #[must_use]
    pub fn normalized_subjects(&self) -> Vec<String> {
        self.subjects
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Returns the configured delivery sink, treating blank values as unset.
    #[must_use]
    pub fn delivery_sink(&self) -> Option<&str> {
        self.target_sink
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Marker that a post has already been delivered for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessedPostRecord {
    pub task_id: i64,
    pub post_unique_id: String,
}
