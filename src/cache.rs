use crate::aggregate::{aggregate, AggregateRow, AggregateSpec};
use crate::error::Result;
use crate::filter::{filter, FilterCriteria};
use crate::store::RecordStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache key for derived tables
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub criteria: FilterCriteria,
    pub spec: AggregateSpec,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Identity of the snapshot cached entries were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SnapshotTag {
    id: u64,
    generation: u64,
}

impl SnapshotTag {
    fn of(store: &RecordStore) -> Self {
        Self {
            id: store.id(),
            generation: store.generation(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<SnapshotTag>,
    entries: HashMap<CacheKey, Arc<Vec<AggregateRow>>>,
    hits: u64,
    misses: u64,
}

/// Filter + aggregate results keyed by criteria and aggregation spec.
///
/// Entries belong to one record snapshot. The first lookup against any other
/// snapshot drops them and adopts that snapshot, unless it is of an older
/// generation: those lookups are computed but not stored.
#[derive(Debug, Default)]
pub struct AggregateCache {
    state: Mutex<CacheState>,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &self,
        store: &RecordStore,
        criteria: &FilterCriteria,
        spec: &AggregateSpec,
    ) -> Result<Arc<Vec<AggregateRow>>> {
        spec.validate()?;
        let key = CacheKey {
            criteria: criteria.clone(),
            spec: spec.clone(),
        };
        let tag = SnapshotTag::of(store);

        {
            let mut state = self.state.lock();
            let cached = state.snapshot;
            match cached {
                Some(current) if current == tag => {
                    if let Some(rows) = state.entries.get(&key).cloned() {
                        state.hits += 1;
                        return Ok(rows);
                    }
                }
                Some(current) if tag.generation < current.generation => {}
                _ => {
                    if !state.entries.is_empty() {
                        log::debug!(
                            "dropping {} cached table(s) from snapshot {}",
                            state.entries.len(),
                            cached.map_or(0, |current| current.id)
                        );
                    }
                    state.entries.clear();
                    state.snapshot = Some(tag);
                }
            }
        }

        // Computed outside the lock; the stages are pure
        let subset = filter(store.records(), criteria)?;
        let rows = Arc::new(aggregate(subset, spec));

        let mut state = self.state.lock();
        state.misses += 1;
        if state.snapshot == Some(tag) {
            state.entries.insert(key, Arc::clone(&rows));
        }
        Ok(rows)
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.snapshot = None;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
        }
    }
}
