//! Live integration tests for feedwatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need `DATABASE_URL` and are ignored by default:
//! `cargo test -p feedwatch-db -- --ignored`.

use chrono::Utc;
use feedwatch_core::TaskStore;
use feedwatch_db::{
    create_scrape_task, get_scrape_task, list_enabled_scrape_tasks, list_processed_post_ids,
    list_scrape_tasks, record_task_run, set_task_enabled, update_task_schedule, DbError,
    NewScrapeTask, PgTaskStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_task(name: &str, is_enabled: bool) -> NewScrapeTask {
    NewScrapeTask {
        owner_id: 42,
        name: name.to_string(),
        subjects: vec!["chainlink".to_string(), "bitcoin".to_string()],
        schedule: "0 * * * *".to_string(),
        is_enabled,
        target_sink: Some("-1001".to_string()),
        ai_model: Some("gpt-4o-mini".to_string()),
        summary_prompt: Some("Summarize".to_string()),
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

// ---------------------------------------------------------------------------
// scrape_tasks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_and_fetch_task(pool: sqlx::PgPool) {
    let created = create_scrape_task(&pool, &new_task("watch", true))
        .await
        .expect("create_scrape_task failed");

    let fetched = get_scrape_task(&pool, created.id)
        .await
        .expect("get_scrape_task failed")
        .expect("task should exist");

    assert_eq!(fetched.name, "watch");
    assert_eq!(fetched.subjects, vec!["chainlink", "bitcoin"]);
    assert!(fetched.last_run_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn enabled_listing_excludes_disabled_tasks(pool: sqlx::PgPool) {
    let on = create_scrape_task(&pool, &new_task("on", true)).await.unwrap();
    create_scrape_task(&pool, &new_task("off", false)).await.unwrap();

    let enabled = list_enabled_scrape_tasks(&pool).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, on.id);

    let all = list_scrape_tasks(&pool).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn schedule_and_enabled_updates_are_visible(pool: sqlx::PgPool) {
    let task = create_scrape_task(&pool, &new_task("watch", false)).await.unwrap();

    update_task_schedule(&pool, task.id, "0 9 * * *").await.unwrap();
    set_task_enabled(&pool, task.id, true).await.unwrap();

    let fetched = get_scrape_task(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(fetched.schedule, "0 9 * * *");
    assert!(fetched.is_enabled);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn updating_missing_task_is_not_found(pool: sqlx::PgPool) {
    let result = update_task_schedule(&pool, 9_999, "0 9 * * *").await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// processed_posts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn record_task_run_is_idempotent(pool: sqlx::PgPool) {
    let task = create_scrape_task(&pool, &new_task("watch", true)).await.unwrap();
    let ran_at = Utc::now();

    let first = record_task_run(&pool, task.id, &ids(&["a", "b"]), ran_at)
        .await
        .unwrap();
    let second = record_task_run(&pool, task.id, &ids(&["b", "c"]), ran_at)
        .await
        .unwrap();

    assert_eq!(first, 2);
    assert_eq!(second, 1, "only 'c' is new");

    let stored = list_processed_post_ids(&pool, task.id).await.unwrap();
    assert_eq!(stored.len(), 3);

    let fetched = get_scrape_task(&pool, task.id).await.unwrap().unwrap();
    assert!(fetched.last_run_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn record_task_run_for_missing_task_rolls_back(pool: sqlx::PgPool) {
    let result = record_task_run(&pool, 9_999, &[], Utc::now()).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_task_cascades_processed_posts(pool: sqlx::PgPool) {
    let task = create_scrape_task(&pool, &new_task("watch", true)).await.unwrap();
    record_task_run(&pool, task.id, &ids(&["a"]), Utc::now())
        .await
        .unwrap();

    sqlx::query("DELETE FROM scrape_tasks WHERE id = $1")
        .bind(task.id)
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed_posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn pg_task_store_round_trips_through_trait(pool: sqlx::PgPool) {
    let task = create_scrape_task(&pool, &new_task("watch", true)).await.unwrap();
    let store = PgTaskStore::new(pool);

    let loaded = store.get_task(task.id).await.unwrap().expect("task");
    assert_eq!(loaded.name, "watch");
    assert!(store.get_task(9_999).await.unwrap().is_none());

    store
        .record_run(task.id, &ids(&["x"]), Utc::now())
        .await
        .unwrap();
    let processed = store.processed_post_ids(task.id).await.unwrap();
    assert!(processed.contains("x"));
    assert_eq!(store.list_enabled_tasks().await.unwrap().len(), 1);
}
