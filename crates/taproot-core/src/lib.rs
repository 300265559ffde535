//! Taproot Core: graph data model, snapshots, search index and impact analysis

pub mod cache;
pub mod diff;
pub mod error;
pub mod graph;
pub mod impact;
pub mod model;
pub mod search;
pub mod snapshot;
pub mod tokenize;


pub use cache::{CACHE_DIR, SNAPSHOT_CACHE, cache_dir, clear_cache, load_snapshot, save_snapshot, snapshot_cache_path};
pub use diff::SnapshotDiff;
pub use error::{Error, ErrorKind, Result};
pub use graph::GraphStore;
pub use impact::{DEFAULT_DEPTH_CAP, ImpactAnalyzer, ImpactQuery, Impacted};
pub use model::{
    BuildStats, BuildWarning, Dependency, DependencySpec, Direction, FileRecord, Fingerprint, Language, Link, Node,
    NodeId, NodeKind, NodeMetadata, Relation, SymbolDecl, SymbolKind,
};
pub use search::{MAX_LIMIT, SearchHit, SearchIndex};
pub use snapshot::{Snapshot, SnapshotCell};
