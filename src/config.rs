use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::client::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::model::Season;
use crate::scraper::DEFAULT_BASE_URL;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub bot: BotConfig,
    /// Season used when a request does not name one (default: the current season)
    #[serde(default)]
    pub default_season: Option<Season>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where and how statistics pages are fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Number of season tables kept in memory
    #[serde(default = "default_max_seasons")]
    pub max_seasons: usize,
}

fn default_max_seasons() -> usize {
    10
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_seasons: default_max_seasons(),
        }
    }
}

/// Serve pre-extracted JSON snapshots instead of scraping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Token issued by BotFather
    #[serde(default)]
    pub token: Option<String>,
    /// Public URL of the mini app the bot's button opens
    #[serde(default)]
    pub web_app_url: Option<String>,
    #[serde(default = "default_bot_api_url")]
    pub api_url: String,
    /// Long-polling timeout for getUpdates, in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_bot_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            web_app_url: None,
            api_url: default_bot_api_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Read a variable, treating unset and blank the same.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load configuration from the `config` directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("KHL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (KHL_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("KHL")
                    .separator("__")
                    .try_parsing(true),
            )
            // Variables understood by earlier deployments
            .set_override_option("server.port", env_var("PORT"))?
            .set_override_option("default_season", env_var("DEFAULT_SEASON"))?
            .set_override_option("bot.token", env_var("TELEGRAM_BOT_TOKEN"))?
            .set_override_option("bot.web_app_url", env_var("WEB_APP_URL"))?;

        builder.build()?.try_deserialize()
    }

    /// The season to use when a request leaves it out.
    pub fn fallback_season(&self) -> Season {
        self.default_season.unwrap_or_else(Season::current)
    }
}
