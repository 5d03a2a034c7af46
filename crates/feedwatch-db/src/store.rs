//! [`TaskStore`] backed by Postgres.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedwatch_core::{ScrapeTask, StoreError, TaskStore};
use sqlx::PgPool;

use crate::{processed_posts, tasks, DbError};

#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_error(task_id: i64, e: DbError) -> StoreError {
    match e {
        DbError::NotFound => StoreError::TaskNotFound(task_id),
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn get_task(&self, task_id: i64) -> Result<Option<ScrapeTask>, StoreError> {
        let row = tasks::get_scrape_task(&self.pool, task_id)
            .await
            .map_err(|e| store_error(task_id, e))?;
        Ok(row.map(ScrapeTask::from))
    }

    async fn list_enabled_tasks(&self) -> Result<Vec<ScrapeTask>, StoreError> {
        let rows = tasks::list_enabled_scrape_tasks(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows.into_iter().map(ScrapeTask::from).collect())
    }

    async fn processed_post_ids(&self, task_id: i64) -> Result<HashSet<String>, StoreError> {
        processed_posts::list_processed_post_ids(&self.pool, task_id)
            .await
            .map_err(|e| store_error(task_id, e))
    }

    async fn record_run(
        &self,
        task_id: i64,
        post_ids: &[String],
        ran_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        processed_posts::record_task_run(&self.pool, task_id, post_ids, ran_at)
            .await
            .map_err(|e| store_error(task_id, e))
    }
}
