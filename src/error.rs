use ::scraper::error::SelectorErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::model::{Mode, Season};

/// All errors that can occur while loading, indexing and serving player stats.
#[derive(thiserror::Error, Debug)]
pub enum KhlError {
    /// HTTP request failed (network, DNS, TLS, timeout, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// Server returned a non-success HTTP status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to read the response body as text.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed (TLS backend, proxy settings).
    #[error("failed to build http client: {0}")]
    ClientBuild(reqwest::Error),

    /// A CSS selector string could not be parsed.
    #[error("invalid CSS selector: {0}")]
    Selector(String),

    /// The page did not contain a player statistics table.
    #[error("statistics table not found in document")]
    TableNotFound,

    /// The statistics table was found but no row survived normalization.
    #[error("no player rows for season {season} ({mode})")]
    EmptySeason { season: Season, mode: Mode },

    /// A season label that is neither "YYYY/YYYY" nor "YYYY".
    #[error("invalid season: {0:?}")]
    InvalidSeason(String),

    /// A snapshot file could not be read or written.
    #[error("snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A snapshot file is not a JSON array of player records.
    #[error("malformed snapshot {path:?}: {source}")]
    SnapshotFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The Telegram Bot API answered with `ok: false`.
    #[error("telegram api error: {0}")]
    Bot(String),

    /// A failed season build, handed to every request that waited on it.
    #[error(transparent)]
    Shared(Arc<KhlError>),
}

impl KhlError {
    /// Whether this error means "no data for this season/mode right now".
    ///
    /// All of these collapse into the same user-facing message.
    pub fn is_unavailable(&self) -> bool {
        match self {
            KhlError::Shared(inner) => inner.is_unavailable(),
            other => matches!(
                other,
                KhlError::Http { .. }
                    | KhlError::UnexpectedStatus { .. }
                    | KhlError::ResponseBody { .. }
                    | KhlError::TableNotFound
                    | KhlError::EmptySeason { .. }
                    | KhlError::Snapshot { .. }
                    | KhlError::SnapshotFormat { .. }
            ),
        }
    }

    /// The underlying error, looking through [`KhlError::Shared`].
    pub fn root(&self) -> &KhlError {
        match self {
            KhlError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

impl<'a> From<SelectorErrorKind<'a>> for KhlError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        KhlError::Selector(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KhlError>;
