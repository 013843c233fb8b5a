pub(crate) mod stats_table;

use ::scraper::ElementRef;
use tracing::{debug, warn};

use crate::error::{KhlError, Result};
use crate::model::SeasonKey;

pub const DEFAULT_BASE_URL: &str = "https://allhockey.ru";

/// Build the statistics page URL for one season table.
///
/// The site keys seasons by their ending year: `/stat/khl/2024/312/player`
/// is the 2023/2024 regular season.
pub(crate) fn stats_url(base_url: &str, key: &SeasonKey) -> String {
    format!(
        "{}/stat/khl/{}/{}/player",
        base_url.trim_end_matches('/'),
        key.season.end_year(),
        key.mode.code()
    )
}

/// Fetch a URL and return the response body, retrying once on failure.
pub(crate) async fn get_page(client: &reqwest::Client, url: &str) -> Result<String> {
    match fetch_once(client, url).await {
        Ok(body) => Ok(body),
        Err(err) => {
            warn!(url, error = %err, "fetch failed, retrying once");
            fetch_once(client, url).await
        }
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!(url, "fetching page");

    let response = client.get(url).send().await.map_err(|e| KhlError::Http {
        url: url.to_owned(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(KhlError::UnexpectedStatus {
            url: url.to_owned(),
            status,
        });
    }

    response.text().await.map_err(|e| KhlError::ResponseBody {
        url: url.to_owned(),
        source: e,
    })
}

/// Concatenated, trimmed text of a table cell.
pub(crate) fn cell_text(el: &ElementRef) -> String {
    el.text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
