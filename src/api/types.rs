use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::KhlError;
use crate::model::{Mode, Season, SeasonKey, Suggestion};

// ============================================================================
// Query Types
// ============================================================================

/// `season` and `playoff` parameters shared by every endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SeasonQuery {
    pub season: Option<String>,
    pub playoff: Option<String>,
}

impl SeasonQuery {
    /// Resolve to a cache key; a blank season falls back to `fallback`.
    pub fn key(&self, fallback: Season) -> Result<SeasonKey, ApiError> {
        let season = match self.season.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse()?,
            _ => fallback,
        };
        let mode = self
            .playoff
            .as_deref()
            .map(Mode::from_flag)
            .unwrap_or_default();
        Ok(SeasonKey::new(season, mode))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(flatten)]
    pub season: SeasonQuery,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub player: String,
    #[serde(flatten)]
    pub season: SeasonQuery,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub season: Season,
    pub playoff: bool,
    pub players: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Suggestion>>,
}

// ============================================================================
// Errors
// ============================================================================

pub const UNAVAILABLE_MESSAGE: &str = "Statistics are unavailable right now, try again later";

/// Everything a handler can answer instead of a result.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    /// Several players match; the client should let the user choose.
    Ambiguous(Vec<Suggestion>),
    /// The source could not be read or had no data for the season.
    Unavailable,
    Internal,
}

impl From<KhlError> for ApiError {
    fn from(err: KhlError) -> Self {
        match err {
            _ if matches!(err.root(), KhlError::InvalidSeason(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            err if err.is_unavailable() => {
                warn!(error = %err, "season data unavailable");
                ApiError::Unavailable
            }
            err => {
                error!(error = %err, "request failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, candidates) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Player not found".to_string(), None),
            ApiError::Ambiguous(candidates) => (
                StatusCode::MULTIPLE_CHOICES,
                "Several players match, pick one".to_string(),
                Some(candidates),
            ),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                UNAVAILABLE_MESSAGE.to_string(),
                None,
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
                None,
            ),
        };
        (status, Json(ErrorBody { error, candidates })).into_response()
    }
}
