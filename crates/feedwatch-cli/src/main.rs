mod scrape;
mod tasks;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feedwatch_core::config::{DEFAULT_FEED_URL_TEMPLATE, DEFAULT_USER_AGENT};
use feedwatch_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::tasks::TaskCommands;

#[derive(Debug, Parser)]
#[command(name = "feedwatch-cli")]
#[command(about = "Community feed watcher command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape one subject's feed once and print the posts as JSON
    Scrape(ScrapeArgs),
    /// Execute one task now: scrape, summarize, deliver, record
    Run {
        /// Task id
        task_id: i64,
    },
    /// Manage scrape tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, clap::Args)]
struct ScrapeArgs {
    /// Subject name as it appears in the feed URL (e.g. chainlink)
    subject: String,
    /// Only keep posts newer than this many hours
    #[arg(long, default_value = "24")]
    hours: u32,
    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, env = "FEEDWATCH_WEBDRIVER_URL", default_value = "http://localhost:9515")]
    webdriver_url: String,
    #[arg(long, env = "FEEDWATCH_FEED_URL_TEMPLATE", default_value = DEFAULT_FEED_URL_TEMPLATE)]
    feed_url_template: String,
    #[arg(long, env = "FEEDWATCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("feedwatch-cli: pass --help for available commands");
        return Ok(());
    };

    match command {
        // Browser only; no database needed.
        Commands::Scrape(args) => scrape::run_scrape(&args).await,
        Commands::Run { task_id } => {
            let (config, pool) = connect().await?;
            tasks::run_task(&pool, &config, task_id).await
        }
        Commands::Tasks { command } => {
            let (_, pool) = connect().await?;
            tasks::dispatch(&pool, command).await
        }
        Commands::Db { command } => {
            let (_, pool) = connect().await?;
            match command {
                DbCommands::Ping => {
                    feedwatch_db::health_check(&pool).await?;
                    println!("database: ok");
                }
                DbCommands::Migrate => {
                    let applied = feedwatch_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
            }
            Ok(())
        }
    }
}

async fn connect() -> anyhow::Result<(AppConfig, sqlx::PgPool)> {
    let config = feedwatch_core::load_app_config()?;
    let pool_config = feedwatch_db::PoolConfig::from_app_config(&config);
    let pool = feedwatch_db::connect_pool(&config.database_url, pool_config).await?;
    Ok((config, pool))
}
