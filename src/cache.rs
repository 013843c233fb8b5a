use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::{KhlError, Result};
use crate::index::SeasonIndex;
use crate::model::{PlayerRecord, SeasonKey};

/// Where season tables come from: the live site or a static snapshot.
#[async_trait]
pub trait IndexSource: Send + Sync {
    async fn load(&self, key: SeasonKey) -> Result<Vec<PlayerRecord>>;
}

/// The result of one build, shared by every request that waited on it.
type Outcome = std::result::Result<Arc<SeasonIndex>, Arc<KhlError>>;
type Slot = Arc<OnceCell<Outcome>>;

fn is_built(slot: &Slot) -> bool {
    matches!(slot.get(), Some(Ok(_)))
}

#[derive(Default)]
struct Slots {
    cells: HashMap<SeasonKey, Slot>,
    /// Keys oldest first, ordered by when their index was built.
    order: VecDeque<SeasonKey>,
}

impl Slots {
    /// The slot for `key`, adding an empty one if there is none.
    fn get_or_insert(&mut self, key: SeasonKey) -> Slot {
        if let Some(slot) = self.cells.get(&key) {
            return slot.clone();
        }
        let slot = Slot::default();
        self.cells.insert(key, slot.clone());
        self.order.push_back(key);
        slot
    }

    /// Put `slot` under `key` as the newest entry.
    fn replace(&mut self, key: SeasonKey, slot: Slot) {
        self.order.retain(|k| *k != key);
        self.cells.insert(key, slot);
        self.order.push_back(key);
    }

    /// Record the outcome of the build behind `slot`.
    ///
    /// A failed slot is dropped so the next request starts a fresh build; a
    /// built one becomes the newest entry. Nothing happens when `key` has
    /// since been replaced or invalidated.
    fn settle(&mut self, key: SeasonKey, slot: &Slot, capacity: usize) {
        if !self.cells.get(&key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            return;
        }
        match slot.get() {
            Some(Ok(_)) => {
                self.replace(key, slot.clone());
                self.evict(capacity);
            }
            Some(Err(_)) => {
                self.remove(&key);
            }
            None => {}
        }
    }

    /// Drop the oldest built indexes until at most `capacity` remain.
    /// Slots still building do not count.
    fn evict(&mut self, capacity: usize) {
        loop {
            let mut built = self
                .order
                .iter()
                .filter(|k| self.cells.get(*k).is_some_and(is_built));
            let Some(oldest) = built.next().copied() else {
                return;
            };
            if built.count() < capacity {
                return;
            }
            debug!(key = %oldest, "evicting season index");
            self.remove(&oldest);
        }
    }

    fn remove(&mut self, key: &SeasonKey) -> bool {
        self.order.retain(|k| k != key);
        self.cells.remove(key).is_some()
    }
}

/// In-memory season indexes, built on first use.
///
/// Each key owns a slot; every request for a key that is still being built
/// waits on the same build and gets its result, error included, so one key is
/// never fetched twice at once. A failed slot is dropped right away, so it
/// neither takes up capacity nor stops a later request from trying again.
pub struct IndexCache {
    source: Arc<dyn IndexSource>,
    capacity: usize,
    slots: Mutex<Slots>,
}

impl IndexCache {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(source: Arc<dyn IndexSource>) -> Self {
        Self::with_capacity(source, Self::DEFAULT_CAPACITY)
    }

    /// Keep at most `capacity` season tables, dropping the oldest first.
    pub fn with_capacity(source: Arc<dyn IndexSource>, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
            slots: Mutex::new(Slots::default()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn build(&self, key: SeasonKey) -> Result<Arc<SeasonIndex>> {
        let records = self.source.load(key).await?;
        if records.is_empty() {
            return Err(KhlError::EmptySeason {
                season: key.season,
                mode: key.mode,
            });
        }
        let index = SeasonIndex::new(key, records);
        info!(%key, players = index.len(), "built season index");
        Ok(Arc::new(index))
    }

    /// The index for `key`, building it if it is not cached yet.
    ///
    /// A build failure reaches every request that waited on it as
    /// [`KhlError::Shared`].
    #[instrument(skip(self))]
    pub async fn get(&self, key: SeasonKey) -> Result<Arc<SeasonIndex>> {
        let slot = self.slots().get_or_insert(key);
        let outcome = slot
            .get_or_init(|| async { self.build(key).await.map_err(Arc::new) })
            .await
            .clone();
        self.slots().settle(key, &slot, self.capacity);
        outcome.map_err(KhlError::Shared)
    }

    /// Rebuild `key` from the source and replace the cached index.
    ///
    /// The previous index keeps serving until the new one is ready and stays
    /// in place if the rebuild fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self, key: SeasonKey) -> Result<Arc<SeasonIndex>> {
        let index = self.build(key).await?;
        let slot = Arc::new(OnceCell::new_with(Some(Ok(index.clone()))));
        let mut slots = self.slots();
        slots.replace(key, slot);
        slots.evict(self.capacity);
        Ok(index)
    }

    /// Drop the cached index for `key`. Returns whether one was cached.
    pub fn invalidate(&self, key: &SeasonKey) -> bool {
        self.slots().remove(key)
    }

    pub fn clear(&self) {
        let mut slots = self.slots();
        slots.cells.clear();
        slots.order.clear();
    }

    /// Keys whose index is built and ready.
    pub fn cached_keys(&self) -> Vec<SeasonKey> {
        let slots = self.slots();
        slots
            .order
            .iter()
            .filter(|k| slots.cells.get(*k).is_some_and(is_built))
            .copied()
            .collect()
    }
}
