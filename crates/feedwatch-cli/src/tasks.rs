//! Task management and one-off execution.

use std::sync::Arc;

use clap::Subcommand;
use feedwatch_core::schedule::validate_cron;
use feedwatch_core::{AppConfig, TaskStore};
use feedwatch_db::{NewScrapeTask, PgTaskStore, ScrapeTaskRow};
use feedwatch_pipeline::ExecutionOutcome;

#[derive(Debug, Subcommand)]
pub enum TaskCommands {
    /// List all tasks
    List,
    /// Create a task
    Add {
        #[arg(long)]
        name: String,
        /// Recipient of failure alerts
        #[arg(long)]
        owner: i64,
        /// Comma-separated subject names (e.g. chainlink,bitcoin)
        #[arg(long, value_delimiter = ',')]
        subjects: Vec<String>,
        /// Five-field cron expression, evaluated in UTC
        #[arg(long, default_value = "0 * * * *")]
        schedule: String,
        /// Chat id summaries are delivered to
        #[arg(long)]
        sink: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        /// Enable the task immediately
        #[arg(long)]
        enabled: bool,
    },
}

pub(crate) async fn dispatch(pool: &sqlx::PgPool, command: TaskCommands) -> anyhow::Result<()> {
    match command {
        TaskCommands::List => list_tasks(pool).await,
        TaskCommands::Add {
            name,
            owner,
            subjects,
            schedule,
            sink,
            model,
            prompt,
            enabled,
        } => {
            let task = new_task(name, owner, subjects, &schedule, sink, model, prompt, enabled)?;
            let row = feedwatch_db::create_scrape_task(pool, &task).await?;
            println!("created task {} ({})", row.id, row.name);
            Ok(())
        }
    }
}

/// Validates CLI input into a [`NewScrapeTask`].
#[allow(clippy::too_many_arguments)]
pub(crate) fn new_task(
    name: String,
    owner: i64,
    subjects: Vec<String>,
    schedule: &str,
    sink: Option<String>,
    model: Option<String>,
    prompt: Option<String>,
    enabled: bool,
) -> anyhow::Result<NewScrapeTask> {
    let name = name.trim().to_string();
    anyhow::ensure!(!name.is_empty(), "task name must not be empty");

    let subjects: Vec<String> = subjects
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    anyhow::ensure!(!subjects.is_empty(), "at least one subject is required");

    Ok(NewScrapeTask {
        owner_id: owner,
        name,
        subjects,
        schedule: validate_cron(schedule)?,
        is_enabled: enabled,
        target_sink: sink,
        ai_model: model,
        summary_prompt: prompt,
    })
}

async fn list_tasks(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let rows = feedwatch_db::list_scrape_tasks(pool).await?;
    if rows.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    for row in &rows {
        println!("{}", format_task(row));
    }
    Ok(())
}

fn format_task(row: &ScrapeTaskRow) -> String {
    let last_run = row.last_run_at.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    format!(
        "{:>4}  {:<8} {:<14} {:<24} last run: {}  [{}]",
        row.id,
        if row.is_enabled { "enabled" } else { "disabled" },
        row.schedule,
        row.name,
        last_run,
        row.subjects.join(", "),
    )
}

/// Executes task `task_id` in the foreground and reports the outcome.
///
/// # Errors
///
/// Returns an error if the executor cannot be built or the execution
/// failed.
pub(crate) async fn run_task(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    task_id: i64,
) -> anyhow::Result<()> {
    let store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(pool.clone()));
    let executor = feedwatch_pipeline::build_executor(config, store)?;

    match executor.execute(task_id).await {
        ExecutionOutcome::Failed => anyhow::bail!("task {task_id} failed; see logs"),
        outcome => {
            println!("task {task_id}: {outcome:?}");
            Ok(())
        }
    }
}
