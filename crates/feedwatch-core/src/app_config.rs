use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub webdriver_url: String,
    pub browser_headless: bool,
    /// Feed URL with a `{subject}` placeholder.
    pub feed_url_template: String,
    pub user_agent: String,
    pub horizon_hours: u32,
    pub scrape_budget_secs: u64,
    pub navigation_timeout_ms: u64,
    pub operation_timeout_ms: u64,
    pub selector_timeout_ms: u64,
    pub max_scrolls: u32,
    pub scroll_pause_ms: u64,
    pub misfire_grace_secs: u64,
    pub ai_base_url: String,
    pub openai_api_key: Option<String>,
    pub telegram_api_url: String,
    pub telegram_bot_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("webdriver_url", &self.webdriver_url)
            .field("browser_headless", &self.browser_headless)
            .field("feed_url_template", &self.feed_url_template)
            .field("user_agent", &self.user_agent)
            .field("horizon_hours", &self.horizon_hours)
            .field("scrape_budget_secs", &self.scrape_budget_secs)
            .field("navigation_timeout_ms", &self.navigation_timeout_ms)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .field("selector_timeout_ms", &self.selector_timeout_ms)
            .field("max_scrolls", &self.max_scrolls)
            .field("scroll_pause_ms", &self.scroll_pause_ms)
            .field("misfire_grace_secs", &self.misfire_grace_secs)
            .field("ai_base_url", &self.ai_base_url)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("telegram_api_url", &self.telegram_api_url)
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
