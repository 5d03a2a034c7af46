//! Database operations for the `scrape_tasks` table.

use chrono::{DateTime, Utc};
use feedwatch_core::ScrapeTask;
use sqlx::PgPool;

use crate::DbError;

const TASK_COLUMNS: &str = "id, owner_id, name, subjects, schedule, is_enabled, target_sink, \
     ai_model, summary_prompt, last_run_at, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `scrape_tasks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeTaskRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub subjects: Vec<String>,
    pub schedule: String,
    pub is_enabled: bool,
    pub target_sink: Option<String>,
    pub ai_model: Option<String>,
    pub summary_prompt: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScrapeTaskRow> for ScrapeTask {
    fn from(row: ScrapeTaskRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            subjects: row.subjects,
            schedule: row.schedule,
            is_enabled: row.is_enabled,
            target_sink: row.target_sink,
            ai_model: row.ai_model,
            summary_prompt: row.summary_prompt,
            last_run_at: row.last_run_at,
        }
    }
}

/// Fields accepted when creating a task.
///
/// `schedule` must already be validated by the caller.
#[derive(Debug, Clone)]
pub struct NewScrapeTask {
    pub owner_id: i64,
    pub name: String,
    pub subjects: Vec<String>,
    pub schedule: String,
    pub is_enabled: bool,
    pub target_sink: Option<String>,
    pub ai_model: Option<String>,
    pub summary_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetches a single task by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_scrape_task(pool: &PgPool, id: i64) -> Result<Option<ScrapeTaskRow>, DbError> {
    let row = sqlx::query_as::<_, ScrapeTaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM scrape_tasks WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every task, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_tasks(pool: &PgPool) -> Result<Vec<ScrapeTaskRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeTaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM scrape_tasks ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns tasks with `is_enabled = true`, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_enabled_scrape_tasks(pool: &PgPool) -> Result<Vec<ScrapeTaskRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeTaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM scrape_tasks WHERE is_enabled ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a new task and returns the created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_scrape_task(
    pool: &PgPool,
    task: &NewScrapeTask,
) -> Result<ScrapeTaskRow, DbError> {
    let row = sqlx::query_as::<_, ScrapeTaskRow>(&format!(
        "INSERT INTO scrape_tasks \
             (owner_id, name, subjects, schedule, is_enabled, target_sink, ai_model, summary_prompt) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {TASK_COLUMNS}"
    ))
    .bind(task.owner_id)
    .bind(&task.name)
    .bind(&task.subjects)
    .bind(&task.schedule)
    .bind(task.is_enabled)
    .bind(&task.target_sink)
    .bind(&task.ai_model)
    .bind(&task.summary_prompt)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Replaces a task's cron expression.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no task has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_task_schedule(pool: &PgPool, id: i64, schedule: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_tasks SET schedule = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(schedule)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Enables or disables a task.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no task has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_task_enabled(pool: &PgPool, id: i64, is_enabled: bool) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_tasks SET is_enabled = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(is_enabled)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
