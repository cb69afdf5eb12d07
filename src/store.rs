//! The record store: an immutable snapshot of loaded records.
//!
//! Readers take an `Arc` to the current snapshot and keep working with it even
//! if a reload publishes a newer one in the meantime. Each snapshot carries a
//! process-wide unique id, which derived-table caches key their entries on,
//! and a generation number that orders snapshots published through one handle.

use crate::error::Result;
use crate::filter::{FilterCriteria, YearRange};
use crate::models::{Dimension, KeyValue, Record};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct RecordStore {
    id: u64,
    generation: u64,
    records: Arc<[Record]>,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self::with_generation(records, 0)
    }

    fn with_generation(records: Vec<Record>, generation: u64) -> Self {
        Self {
            id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
            generation,
            records: records.into(),
        }
    }

    /// Unique per constructed snapshot; clones share it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest year present, `None` for an empty store.
    pub fn year_bounds(&self) -> Option<YearRange> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some(YearRange::new(min, max))
    }

    pub fn distinct(&self, dimension: Dimension) -> BTreeSet<KeyValue> {
        self.records
            .iter()
            .map(|record| dimension.value_of(record))
            .collect()
    }

    fn distinct_text(&self, dimension: Dimension) -> BTreeSet<String> {
        self.distinct(dimension)
            .into_iter()
            .map(|value| value.to_string())
            .collect()
    }

    /// Criteria selecting everything: full year span, every quota and gender.
    ///
    /// Fails with `InvalidCriteria` on an empty store, which has no values to
    /// select.
    pub fn default_criteria(&self) -> Result<FilterCriteria> {
        let years = self.year_bounds().unwrap_or(YearRange::new(0, 0));
        FilterCriteria::new(
            years,
            self.distinct_text(Dimension::Quota),
            self.distinct_text(Dimension::Gender),
        )
    }
}

/// Shared handle through which a reload publishes a new snapshot.
#[derive(Debug)]
pub struct StoreHandle {
    current: RwLock<Arc<RecordStore>>,
}

impl StoreHandle {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            current: RwLock::new(Arc::new(RecordStore::new(records))),
        }
    }

    pub fn snapshot(&self) -> Arc<RecordStore> {
        self.current.read().clone()
    }

    /// Replace the current snapshot. Existing snapshots stay valid.
    pub fn publish(&self, records: Vec<Record>) -> Arc<RecordStore> {
        let mut current = self.current.write();
        let next = Arc::new(RecordStore::with_generation(
            records,
            current.generation() + 1,
        ));
        *current = Arc::clone(&next);
        log::info!(
            "published record snapshot generation {} ({} records)",
            next.generation(),
            next.len()
        );
        next
    }
}
