//! Snapshot rebuilds off the query path: a single background worker builds,
//! publishes and persists snapshots while queries keep reading the old one.

pub mod scheduler;
pub mod source;


pub use scheduler::{RebuildHandle, RebuildOptions, RebuildScheduler, RebuildStatus, TriggerOutcome};
pub use source::{SnapshotSource, TreeSource};
