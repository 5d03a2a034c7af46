//! Database operations for the `processed_posts` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Returns the unique ids of every post already processed for `task_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_processed_post_ids(
    pool: &PgPool,
    task_id: i64,
) -> Result<HashSet<String>, DbError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT post_unique_id FROM processed_posts WHERE task_id = $1",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Marks `post_ids` as processed and stamps the task's `last_run_at`, in one
/// transaction.
///
/// Ids already recorded for the task are left untouched. Returns the number
/// of markers inserted.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the task does not exist, or
/// [`DbError::Sqlx`] if any statement fails (the transaction is rolled back).
pub async fn record_task_run(
    pool: &PgPool,
    task_id: i64,
    post_ids: &[String],
    ran_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let inserted = if post_ids.is_empty() {
        0
    } else {
        sqlx::query(
            "INSERT INTO processed_posts (task_id, post_unique_id) \
             SELECT $1, UNNEST($2::text[]) \
             ON CONFLICT (task_id, post_unique_id) DO NOTHING",
        )
        .bind(task_id)
        .bind(post_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected()
    };

    let updated = sqlx::query("UPDATE scrape_tasks SET last_run_at = $1 WHERE id = $2")
        .bind(ran_at)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(inserted)
}
