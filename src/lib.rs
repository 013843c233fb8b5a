pub use cache::{IndexCache, IndexSource};
pub use client::KhlClient;
pub use error::{KhlError, Result};
pub use index::SeasonIndex;
pub use model::*;
pub use search::{lookup, suggest, Lookup};
pub use snapshot::SnapshotSource;

pub mod api;
pub mod bot;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod normalize;
pub mod search;
pub mod snapshot;
pub(crate) mod scraper;

pub use crate::scraper::stats_table::{extract, parse_season_page, Extraction, RawRow};
