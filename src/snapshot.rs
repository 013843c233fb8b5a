use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::cache::IndexSource;
use crate::error::{KhlError, Result};
use crate::model::{PlayerRecord, SeasonKey};
use crate::normalize::revalidate;

/// Serves season tables from pre-extracted JSON files instead of the live site.
///
/// Each file is named after its key (see [`SeasonKey::snapshot_file_name`])
/// and holds a JSON array of player records.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &SeasonKey) -> PathBuf {
        self.dir.join(key.snapshot_file_name())
    }
}

#[async_trait]
impl IndexSource for SnapshotSource {
    #[instrument(skip(self))]
    async fn load(&self, key: SeasonKey) -> Result<Vec<PlayerRecord>> {
        let path = self.path_for(&key);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| KhlError::Snapshot {
                path: path.clone(),
                source,
            })?;
        let records: Vec<PlayerRecord> =
            serde_json::from_slice(&bytes).map_err(|source| KhlError::SnapshotFormat {
                path: path.clone(),
                source,
            })?;
        let total = records.len();
        let records: Vec<PlayerRecord> = records
            .into_iter()
            .filter_map(|record| match revalidate(record) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(error = %e, "dropping snapshot record");
                    None
                }
            })
            .collect();
        let malformed = total - records.len();
        if malformed > 0 {
            warn!(%key, malformed, kept = records.len(), "dropped malformed snapshot records");
        }
        debug!(?path, count = records.len(), "loaded snapshot");
        Ok(records)
    }
}

/// Write `records` as the snapshot file for `key` under `dir`.
pub fn write_snapshot(dir: &Path, key: &SeasonKey, records: &[PlayerRecord]) -> Result<PathBuf> {
    let path = dir.join(key.snapshot_file_name());
    let io_err = |source| KhlError::Snapshot {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    let json = serde_json::to_vec_pretty(records)?;
    std::fs::write(&path, json).map_err(io_err)?;
    Ok(path)
}
