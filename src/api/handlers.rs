use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use crate::api::{state::AppState, types::*};
use crate::model::{PlayerRecord, Suggestion};
use crate::search::{self, Lookup};

/// GET /api/search?q=петров&season=2023/2024&playoff=false
pub async fn search_players(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    if params.q.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    let key = params.season.key(state.fallback_season())?;
    let index = state.cache.get(key).await?;
    let suggestions = search::suggest(&index, &params.q)
        .into_iter()
        .map(Suggestion::from)
        .collect::<Vec<_>>();
    debug!(%key, query = %params.q, count = suggestions.len(), "search");
    Ok(Json(suggestions))
}

/// GET /api/stats?player=Овечкин Александр&season=2023/2024&playoff=false
pub async fn get_player_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<PlayerRecord>, ApiError> {
    if params.player.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing player parameter".to_string()));
    }
    let key = params.season.key(state.fallback_season())?;
    let index = state.cache.get(key).await?;
    match search::lookup(&index, &params.player) {
        Lookup::Found(record) => Ok(Json(record.clone())),
        Lookup::Ambiguous(candidates) => {
            debug!(%key, player = %params.player, count = candidates.len(), "ambiguous lookup");
            Err(ApiError::Ambiguous(
                candidates.into_iter().map(Suggestion::from).collect(),
            ))
        }
        Lookup::NotFound => Err(ApiError::NotFound),
    }
}

/// POST /api/cache/refresh?season=2023/2024&playoff=true
pub async fn refresh_season(
    State(state): State<AppState>,
    Query(params): Query<SeasonQuery>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let key = params.key(state.fallback_season())?;
    let index = state.cache.refresh(key).await?;
    info!(%key, players = index.len(), "season refreshed on request");
    Ok(Json(RefreshResponse {
        season: key.season,
        playoff: key.mode.is_playoffs(),
        players: index.len(),
    }))
}

/// DELETE /api/cache
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.cache.clear();
    info!("season cache cleared");
    StatusCode::NO_CONTENT
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
