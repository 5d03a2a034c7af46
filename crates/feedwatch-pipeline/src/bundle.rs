//! Text sent to the summarizer and the messages produced when it fails.

use std::fmt::Write as _;

use feedwatch_core::{ScrapeTask, ScrapedPost};

/// New posts found for one subject during an execution.
#[derive(Debug, Clone)]
pub struct SubjectBatch {
    pub subject: String,
    pub posts: Vec<ScrapedPost>,
}

/// Groups new posts by subject:
///
/// ```text
/// [SUBJECT: chainlink]
/// - first post body
/// - second post body
/// ---
/// ```
#[must_use]
pub fn build_bundle(batches: &[SubjectBatch]) -> String {
    let mut out = String::new();
    for batch in batches {
        let _ = writeln!(out, "[SUBJECT: {}]", batch.subject);
        let lines: Vec<String> = batch
            .posts
            .iter()
            .map(|post| format!("- {}", post.body()))
            .collect();
        out.push_str(&lines.join("\n"));
        out.push_str("\n---\n");
    }
    out
}

/// Notification sent in place of a summary when summarization is not
/// possible.
#[must_use]
pub fn fallback_message(task_name: &str, new_posts: usize, reason: &str) -> String {
    format!(
        "【AI summary failed】\nTask '{task_name}' found {new_posts} new posts, \
         but summarizing them failed.\nError: {reason}"
    )
}

/// Alert sent to a task's owner when an execution fails outright.
#[must_use]
pub fn owner_failure_notice(task: &ScrapeTask) -> String {
    format!(
        "Scrape task '{}' (ID: {}) failed; check the logs.",
        task.name, task.id
    )
}
