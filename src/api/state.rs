use std::sync::Arc;

use crate::cache::IndexCache;
use crate::model::Season;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Season indexes, shared by every request
    pub cache: Arc<IndexCache>,

    /// Season used when a request leaves it out; `None` means the current season
    pub default_season: Option<Season>,
}

impl AppState {
    pub fn new(cache: Arc<IndexCache>, default_season: Option<Season>) -> Self {
        Self {
            cache,
            default_season,
        }
    }

    pub fn fallback_season(&self) -> Season {
        self.default_season.unwrap_or_else(Season::current)
    }
}
