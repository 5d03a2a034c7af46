//! Offline unit tests for feedwatch-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use feedwatch_core::{load_app_config_from_env, ScrapeTask};
use feedwatch_db::{PoolConfig, ScrapeTaskRow};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    // Only DATABASE_URL is required; everything else falls back to defaults.
    std::env::set_var("DATABASE_URL", "postgres://example");
    std::env::set_var("FEEDWATCH_DB_MAX_CONNECTIONS", "42");
    std::env::set_var("FEEDWATCH_DB_MIN_CONNECTIONS", "7");
    std::env::set_var("FEEDWATCH_DB_ACQUIRE_TIMEOUT_SECS", "9");
    let app_config = load_app_config_from_env().expect("config should load");

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn scrape_task_row_converts_to_domain_task() {
    let now = Utc::now();
    let row = ScrapeTaskRow {
        id: 3,
        owner_id: 99,
        name: "link watch".to_string(),
        subjects: vec!["chainlink".to_string(), "bitcoin".to_string()],
        schedule: "0 */3 * * *".to_string(),
        is_enabled: true,
        target_sink: Some("-100123".to_string()),
        ai_model: Some("gpt-4o-mini".to_string()),
        summary_prompt: None,
        last_run_at: Some(now),
        created_at: now,
        updated_at: now,
    };

    let task = ScrapeTask::from(row);
    assert_eq!(task.id, 3);
    assert_eq!(task.owner_id, 99);
    assert_eq!(task.subjects, vec!["chainlink", "bitcoin"]);
    assert_eq!(task.schedule, "0 */3 * * *");
    assert!(task.is_enabled);
    assert_eq!(task.delivery_sink(), Some("-100123"));
    assert!(task.summary_prompt.is_none());
    assert_eq!(task.last_run_at, Some(now));
}
