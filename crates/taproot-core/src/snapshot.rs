//! Immutable, versioned graph snapshots and their publication point

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::graph::GraphStore;
use crate::model::{BuildStats, BuildWarning, FileRecord};
use crate::search::SearchIndex;

/// One complete build: graph, search index and the per-file records the
/// next incremental build starts from.
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    store: GraphStore,
    search: SearchIndex,
    records: BTreeMap<String, Arc<FileRecord>>,
    warnings: Vec<BuildWarning>,
    stats: BuildStats,
}

impl Snapshot {
    /// Freeze a store. The search index is built here, once per snapshot.
    pub fn new(
        version: u64,
        store: GraphStore,
        records: Vec<Arc<FileRecord>>,
        warnings: Vec<BuildWarning>,
        stats: BuildStats,
    ) -> Self {
        let search = SearchIndex::index(&store);
        let records = records
            .into_iter()
            .map(|record| (record.path.clone(), record))
            .collect();
        Snapshot { version, store, search, records, warnings, stats }
    }

    /// The version-0 snapshot served before the first build is published.
    pub fn empty() -> Self {
        GraphStore::new().snapshot(0)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    pub fn record(&self, path: &str) -> Option<&Arc<FileRecord>> {
        self.records.get(path)
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<FileRecord>> {
        self.records.values()
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

/// The single mutable shared reference: the currently published snapshot.
///
/// Readers take an `Arc` once at query entry and keep using it even if a
/// newer snapshot is published meanwhile; an old snapshot is freed when its
/// last reader drops it.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new(initial: Snapshot) -> Self {
        SnapshotCell {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in `next` and hand back the snapshot it replaced.
    pub fn publish(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}
