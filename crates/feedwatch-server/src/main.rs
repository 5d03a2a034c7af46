mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use chrono::TimeDelta;
use feedwatch_core::TaskStore;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::ApiAuth,
    scheduler::ScheduleCoordinator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = feedwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "server: starting");

    let pool_config = feedwatch_db::PoolConfig::from_app_config(&config);
    let pool = feedwatch_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = feedwatch_db::run_migrations(&pool).await?;
    tracing::info!(applied, "server: migrations up to date");

    let store: Arc<dyn TaskStore> = Arc::new(feedwatch_db::PgTaskStore::new(pool.clone()));
    let executor = feedwatch_pipeline::build_executor(&config, Arc::clone(&store))?;
    let misfire_grace = TimeDelta::seconds(i64::try_from(config.misfire_grace_secs)?);
    let coordinator =
        Arc::new(ScheduleCoordinator::new(store, Arc::new(executor), misfire_grace).await?);
    coordinator.start().await?;
    tracing::info!(
        scheduled = ?coordinator.scheduled_task_ids().await,
        "server: scheduler running"
    );

    let auth = ApiAuth::from_env(matches!(
        config.env,
        feedwatch_core::Environment::Development
    ))?;
    let app = build_app(
        AppState {
            pool,
            coordinator: Arc::clone(&coordinator),
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "server: listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
