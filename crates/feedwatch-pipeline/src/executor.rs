//! One end-to-end execution of a scrape task.
//!
//! Failures are contained at the smallest unit that can still make progress:
//! a subject that fails is skipped, a failed summary becomes a fallback
//! message, a failed delivery is logged. Anything else ends the execution
//! with a best-effort alert to the task owner. [`TaskExecutor::execute`]
//! never returns an error.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use feedwatch_core::{Notifier, ScrapeTask, Summarizer, TaskStore};
use feedwatch_scraper::{Browser, BrowserLauncher, FeedScraper, Page};

use crate::bundle::{build_bundle, fallback_message, owner_failure_notice, SubjectBatch};
use crate::error::ExecutionError;
use crate::filter::{duplicate_count, NewPostFilter};
use crate::url::subject_url;

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Feed URL with a `{subject}` placeholder.
    pub feed_url_template: String,
    /// Client identity presented by every browser session.
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TaskMissing,
    TaskDisabled,
    NoDeliverySink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Skipped(SkipReason),
    NoNewPosts,
    Completed {
        new_posts: usize,
        summarized: bool,
        delivered: bool,
    },
    Failed,
}

/// Runs a task by id. The coordinator schedules against this seam.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run_task(&self, task_id: i64) -> ExecutionOutcome;
}

pub struct TaskExecutor {
    store: Arc<dyn TaskStore>,
    launcher: Arc<dyn BrowserLauncher>,
    scraper: Arc<dyn FeedScraper>,
    summarizer: Arc<dyn Summarizer>,
    notifier: Arc<dyn Notifier>,
    settings: ExecutorSettings,
}

impl TaskExecutor {
    #[must_use]
    pub fn new(
        store: Arc<dyn TaskStore>,
        launcher: Arc<dyn BrowserLauncher>,
        scraper: Arc<dyn FeedScraper>,
        summarizer: Arc<dyn Summarizer>,
        notifier: Arc<dyn Notifier>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            store,
            launcher,
            scraper,
            summarizer,
            notifier,
            settings,
        }
    }

    /// Executes task `task_id` once.
    pub async fn execute(&self, task_id: i64) -> ExecutionOutcome {
        tracing::info!(task_id, "executor: starting task");

        let task = match self.store.get_task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => return skip(task_id, SkipReason::TaskMissing),
            Err(e) => {
                tracing::error!(task_id, error = %e, "executor: failed to load task");
                return ExecutionOutcome::Failed;
            }
        };
        if !task.is_enabled {
            return skip(task_id, SkipReason::TaskDisabled);
        }
        let Some(sink) = task.delivery_sink() else {
            return skip(task_id, SkipReason::NoDeliverySink);
        };

        match self.run(&task, sink).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(task_id, error = %e, "executor: task failed");
                self.alert_owner(&task).await;
                ExecutionOutcome::Failed
            }
        }
    }

    async fn run(&self, task: &ScrapeTask, sink: &str) -> Result<ExecutionOutcome, ExecutionError> {
        let processed = self.store.processed_post_ids(task.id).await?;

        let batches = self.scrape_all(task, &processed).await?;
        if batches.is_empty() {
            tracing::info!(task_id = task.id, "executor: no new posts");
            // Stamps last_run_at so a restart does not replay this fire.
            if let Err(e) = self.store.record_run(task.id, &[], Utc::now()).await {
                tracing::warn!(task_id = task.id, error = %e, "executor: failed to stamp last run");
            }
            return Ok(ExecutionOutcome::NoNewPosts);
        }

        let new_ids: Vec<String> = batches
            .iter()
            .flat_map(|batch| batch.posts.iter().map(|p| p.unique_id.clone()))
            .collect();
        let (message, summarized) = self.summarize(task, &batches, new_ids.len()).await;

        let delivered = match self.notifier.send(sink, &message).await {
            Ok(()) => {
                tracing::info!(task_id = task.id, sink, "executor: summary delivered");
                true
            }
            Err(e) => {
                tracing::error!(task_id = task.id, sink, error = %e, "executor: delivery failed");
                false
            }
        };

        // Marked processed whether or not delivery succeeded.
        let inserted = self
            .store
            .record_run(task.id, &new_ids, Utc::now())
            .await?;
        tracing::info!(
            task_id = task.id,
            new_posts = new_ids.len(),
            inserted,
            "executor: posts marked processed"
        );

        Ok(ExecutionOutcome::Completed {
            new_posts: new_ids.len(),
            summarized,
            delivered,
        })
    }

    /// Acquires one browser session for the whole execution, scrapes every
    /// subject in order, and tears the session down page first.
    ///
    /// A panic inside a pass is caught so the session is still closed; it
    /// surfaces as [`ExecutionError::Panicked`].
    async fn scrape_all(
        &self,
        task: &ScrapeTask,
        processed: &HashSet<String>,
    ) -> Result<Vec<SubjectBatch>, ExecutionError> {
        let browser = self.launcher.launch(&self.settings.user_agent).await?;

        let result = match browser.new_page().await {
            Ok(page) => {
                let passes =
                    AssertUnwindSafe(self.scrape_subjects(task, page.as_ref(), processed))
                        .catch_unwind()
                        .await;
                close_page(task.id, page.as_ref()).await;
                passes.map_err(|payload| ExecutionError::Panicked(panic_message(payload.as_ref())))
            }
            Err(e) => Err(ExecutionError::from(e)),
        };

        close_browser(task.id, browser.as_ref()).await;
        result
    }

    async fn scrape_subjects(
        &self,
        task: &ScrapeTask,
        page: &dyn Page,
        processed: &HashSet<String>,
    ) -> Vec<SubjectBatch> {
        let mut filter = NewPostFilter::new(processed);
        let mut batches = Vec::new();

        for subject in task.normalized_subjects() {
            let url = subject_url(&self.settings.feed_url_template, &subject);
            let scraped = match self.scraper.scrape(page, &url).await {
                Ok(posts) => posts,
                Err(e) => {
                    tracing::error!(
                        task_id = task.id,
                        subject = %subject,
                        url = %url,
                        error = %e,
                        "executor: subject failed"
                    );
                    continue;
                }
            };

            let duplicates = duplicate_count(&scraped);
            if duplicates > 0 {
                tracing::warn!(
                    task_id = task.id,
                    subject = %subject,
                    scraped = scraped.len(),
                    duplicates,
                    "executor: pass returned duplicate posts"
                );
            }

            let posts = filter.admit(scraped);
            if posts.is_empty() {
                tracing::debug!(task_id = task.id, subject = %subject, "executor: nothing new for subject");
                continue;
            }
            tracing::info!(
                task_id = task.id,
                subject = %subject,
                new_posts = posts.len(),
                "executor: new posts"
            );
            batches.push(SubjectBatch { subject, posts });
        }

        batches
    }

    /// Returns the message to deliver and whether it is a real summary.
    async fn summarize(
        &self,
        task: &ScrapeTask,
        batches: &[SubjectBatch],
        new_posts: usize,
    ) -> (String, bool) {
        let model = task.ai_model.as_deref().map(str::trim).filter(|m| !m.is_empty());
        let prompt = task
            .summary_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let (Some(model), Some(prompt)) = (model, prompt) else {
            tracing::warn!(task_id = task.id, "executor: no AI model or prompt configured");
            return (
                fallback_message(
                    &task.name,
                    new_posts,
                    "task has no AI model or summary prompt configured",
                ),
                false,
            );
        };

        let bundle = build_bundle(batches);
        match self.summarizer.summarize(&bundle, prompt, model).await {
            Ok(summary) => {
                tracing::info!(task_id = task.id, model, "executor: summary ready");
                (summary, true)
            }
            Err(e) => {
                tracing::error!(task_id = task.id, model, error = %e, "executor: summarization failed");
                (fallback_message(&task.name, new_posts, &e.to_string()), false)
            }
        }
    }

    async fn alert_owner(&self, task: &ScrapeTask) {
        let owner = task.owner_id.to_string();
        if let Err(e) = self
            .notifier
            .send(&owner, &owner_failure_notice(task))
            .await
        {
            tracing::error!(task_id = task.id, owner_id = task.owner_id, error = %e, "executor: owner alert failed");
        }
    }
}

#[async_trait]
impl TaskRunner for TaskExecutor {
    async fn run_task(&self, task_id: i64) -> ExecutionOutcome {
        self.execute(task_id).await
    }
}

fn skip(task_id: i64, reason: SkipReason) -> ExecutionOutcome {
    tracing::info!(task_id, ?reason, "executor: skipping task");
    ExecutionOutcome::Skipped(reason)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

async fn close_page(task_id: i64, page: &dyn Page) {
    if let Err(e) = page.close().await {
        tracing::warn!(task_id, error = %e, "executor: failed to close page");
    }
}

async fn close_browser(task_id: i64, browser: &dyn Browser) {
    if let Err(e) = browser.close().await {
        tracing::warn!(task_id, error = %e, "executor: failed to close browser");
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
