//! On-disk persistence of published snapshots

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::GraphStore;
use crate::model::{BuildStats, BuildWarning, FileRecord, Link, Node};
use crate::snapshot::Snapshot;

/// Cache directory: .taproot/
pub const CACHE_DIR: &str = ".taproot";

/// Snapshot cache file
pub const SNAPSHOT_CACHE: &str = "snapshot.bin";

/// Bumped whenever the persisted layout changes.
const FORMAT: u32 = 2;

#[derive(Serialize, Deserialize)]
struct PersistedSnapshot {
    format: u32,
    version: u64,
    nodes: Vec<Node>,
    links: Vec<Link>,
    records: Vec<FileRecord>,
    warnings: Vec<BuildWarning>,
    stats: BuildStats,
}

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get snapshot cache file path
pub fn snapshot_cache_path(root: &Path) -> PathBuf {
    cache_dir(root).join(SNAPSHOT_CACHE)
}

/// Write `snapshot` under `root`, replacing any previous cache file.
pub fn save_snapshot(snapshot: &Snapshot, root: &Path) -> Result<()> {
    std::fs::create_dir_all(cache_dir(root))?;
    let persisted = PersistedSnapshot {
        format: FORMAT,
        version: snapshot.version(),
        nodes: snapshot.store().nodes().cloned().collect(),
        links: snapshot.store().links().cloned().collect(),
        records: snapshot.records().map(|record| FileRecord::clone(record)).collect(),
        warnings: snapshot.warnings().to_vec(),
        stats: snapshot.stats(),
    };
    let bytes = bincode::serialize(&persisted)?;

    let path = snapshot_cache_path(root);
    let staging = path.with_extension("bin.tmp");
    std::fs::write(&staging, bytes)?;
    std::fs::rename(&staging, &path)?;

    tracing::debug!("Snapshot v{} cached at {}", snapshot.version(), path.display());
    Ok(())
}

/// Load the cached snapshot, if one exists and is readable.
///
/// A corrupt or foreign-format cache is ignored rather than reported.
pub fn load_snapshot(root: &Path) -> Result<Option<Snapshot>> {
    let path = snapshot_cache_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&path)?;
    let persisted: PersistedSnapshot = match bincode::deserialize(&bytes) {
        Ok(persisted) => persisted,
        Err(e) => {
            tracing::warn!("Ignoring unreadable snapshot cache {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    if persisted.format != FORMAT {
        tracing::warn!(
            "Ignoring snapshot cache with format {} (expected {})",
            persisted.format,
            FORMAT
        );
        return Ok(None);
    }

    let mut store = GraphStore::new();
    store.put_nodes(persisted.nodes)?;
    store.put_links(persisted.links)?;
    let records = persisted.records.into_iter().map(Arc::new).collect();

    tracing::debug!("Snapshot v{} loaded from {}", persisted.version, path.display());
    Ok(Some(Snapshot::new(
        persisted.version,
        store,
        records,
        persisted.warnings,
        persisted.stats,
    )))
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fingerprint, Language, NodeKind, Relation};
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let a = Node::new(NodeKind::File, "src/a.ts").with_terms("src/a.ts");
        let b = Node::new(NodeKind::File, "src/b.ts").with_terms("src/b.ts");
        let link = Link::new(b.id, a.id, Relation::Imports).at_line(3);
        let mut store = GraphStore::new();
        store.put_nodes([a, b]).unwrap();
        store.put_links([link]).unwrap();
        let record = FileRecord {
            path: "src/a.ts".into(),
            language: Language::TypeScript,
            size: 12,
            fingerprint: Fingerprint::of(b"export {}"),
            symbols: vec![],
            dependencies: vec![],
            doc_terms: vec![],
            parse_errors: false,
        };
        Snapshot::new(7, store, vec![Arc::new(record)], vec![], BuildStats::default())
    }

    #[test]
    fn saved_snapshot_loads_back() {
        let dir = TempDir::new().unwrap();
        let original = sample();
        save_snapshot(&original, dir.path()).unwrap();

        let loaded = load_snapshot(dir.path()).unwrap().expect("cache present");
        assert_eq!(loaded.version(), 7);
        assert_eq!(loaded.store().node_count(), 2);
        assert_eq!(loaded.store().link_count(), 1);
        assert_eq!(loaded.record("src/a.ts"), original.record("src/a.ts"));
        assert!(loaded.store().get_node_by_path("src/b.ts").is_ok());
    }

    #[test]
    fn missing_or_corrupt_cache_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_snapshot(dir.path()).unwrap().is_none());

        std::fs::create_dir_all(cache_dir(dir.path())).unwrap();
        std::fs::write(snapshot_cache_path(dir.path()), b"not a snapshot").unwrap();
        assert!(load_snapshot(dir.path()).unwrap().is_none());
    }

    #[test]
    fn clear_removes_cache_dir() {
        let dir = TempDir::new().unwrap();
        save_snapshot(&sample(), dir.path()).unwrap();
        clear_cache(dir.path()).unwrap();
        assert!(!cache_dir(dir.path()).exists());
    }
}
