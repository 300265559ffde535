//! Where new snapshots come from

use std::path::PathBuf;

use taproot_core::{Result, Snapshot};
use taproot_indexer::Builder;

/// Produces the next snapshot from the currently published one.
///
/// Called on the blocking thread pool, never concurrently with itself.
pub trait SnapshotSource: Send + Sync + 'static {
    fn build(&self, previous: &Snapshot) -> Result<Snapshot>;
}

/// Builds snapshots of a source tree on disk.
pub struct TreeSource {
    root: PathBuf,
    builder: Builder,
}

impl TreeSource {
    pub fn new(root: impl Into<PathBuf>, builder: Builder) -> Self {
        Self { root: root.into(), builder }
    }
}

impl SnapshotSource for TreeSource {
    fn build(&self, previous: &Snapshot) -> Result<Snapshot> {
        // the empty version-0 snapshot carries no records, so this is a full build
        self.builder.build(&self.root, Some(previous))
    }
}
