use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_FEED_URL_TEMPLATE: &str =
    "https://coinmarketcap.com/community/coins/{subject}/latest/";

/// A desktop Chrome identity, so feed requests look like ordinary traffic.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FEEDWATCH_ENV", "development"));
    let bind_addr = parse_addr("FEEDWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("FEEDWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("FEEDWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FEEDWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FEEDWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let webdriver_url = or_default("FEEDWATCH_WEBDRIVER_URL", "http://localhost:9515");
    let browser_headless = parse_bool("FEEDWATCH_BROWSER_HEADLESS", "true")?;

    let feed_url_template = or_default("FEEDWATCH_FEED_URL_TEMPLATE", DEFAULT_FEED_URL_TEMPLATE);
    if !feed_url_template.contains("{subject}") {
        return Err(invalid(
            "FEEDWATCH_FEED_URL_TEMPLATE",
            "template must contain a {subject} placeholder".to_string(),
        ));
    }
    let user_agent = or_default("FEEDWATCH_USER_AGENT", DEFAULT_USER_AGENT);

    let horizon_hours = parse_u32("FEEDWATCH_HORIZON_HOURS", "24")?;
    if horizon_hours == 0 {
        return Err(invalid(
            "FEEDWATCH_HORIZON_HOURS",
            "horizon must be at least one hour".to_string(),
        ));
    }
    let scrape_budget_secs = parse_u64("FEEDWATCH_SCRAPE_BUDGET_SECS", "150")?;
    let navigation_timeout_ms = parse_u64("FEEDWATCH_NAVIGATION_TIMEOUT_MS", "60000")?;
    let operation_timeout_ms = parse_u64("FEEDWATCH_OPERATION_TIMEOUT_MS", "20000")?;
    let selector_timeout_ms = parse_u64("FEEDWATCH_SELECTOR_TIMEOUT_MS", "30000")?;
    let max_scrolls = parse_u32("FEEDWATCH_MAX_SCROLLS", "20")?;
    let scroll_pause_ms = parse_u64("FEEDWATCH_SCROLL_PAUSE_MS", "2000")?;
    let misfire_grace_secs = parse_u64("FEEDWATCH_MISFIRE_GRACE_SECS", "3600")?;

    let ai_base_url = or_default("FEEDWATCH_AI_BASE_URL", "https://api.openai.com/v1");
    let openai_api_key = optional("OPENAI_API_KEY");
    let telegram_api_url = or_default("FEEDWATCH_TELEGRAM_API_URL", "https://api.telegram.org");
    let telegram_bot_token = optional("TELEGRAM_BOT_TOKEN");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        webdriver_url,
        browser_headless,
        feed_url_template,
        user_agent,
        horizon_hours,
        scrape_budget_secs,
        navigation_timeout_ms,
        operation_timeout_ms,
        selector_timeout_ms,
        max_scrolls,
        scroll_pause_ms,
        misfire_grace_secs,
        ai_base_url,
        openai_api_key,
        telegram_api_url,
        telegram_bot_token,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
