use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::cache::IndexSource;
use crate::config::SourceConfig;
use crate::error::{KhlError, Result};
use crate::model::{PlayerRecord, SeasonKey};
use crate::scraper::{self, stats_table, DEFAULT_BASE_URL};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0 Safari/537.36";

/// Reads season statistics tables from allhockey.ru.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> khl_stats::Result<()> {
/// use khl_stats::{KhlClient, Mode, SeasonKey};
///
/// let client = KhlClient::new()?;
/// let key = SeasonKey::new("2023/2024".parse()?, Mode::Regular);
/// let players = client.get_season(key).await?;
/// println!("Found {} players", players.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KhlClient {
    http: reqwest::Client,
    base_url: String,
}

impl KhlClient {
    /// Client for the public site with the default timeout and user agent.
    pub fn new() -> Result<Self> {
        Self::from_config(&SourceConfig::default())
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(KhlError::ClientBuild)?;
        Ok(Self::with_client(http, &config.base_url))
    }

    /// Create a client using the provided [`reqwest::Client`] and site root.
    ///
    /// Use this when you need to configure proxies, headers, etc. The caller
    /// is responsible for setting a timeout on `http`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and normalize every player row of one season table.
    #[instrument(skip(self))]
    pub async fn get_season(&self, key: SeasonKey) -> Result<Vec<PlayerRecord>> {
        let url = scraper::stats_url(&self.base_url, &key);
        let page = scraper::get_page(&self.http, &url).await?;
        let records = stats_table::parse_season_page(&page, &key)?;
        debug!(count = records.len(), "fetched season");
        Ok(records)
    }
}

#[async_trait]
impl IndexSource for KhlClient {
    async fn load(&self, key: SeasonKey) -> Result<Vec<PlayerRecord>> {
        self.get_season(key).await
    }
}
