//! Background rebuild task
//!
//! A single worker owns every build. Triggers go through a channel with one
//! slot: a trigger while a build runs queues exactly one follow-up, and any
//! further trigger before that follow-up starts is coalesced into it.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use taproot_core::{SnapshotCell, SnapshotDiff, save_snapshot};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::source::SnapshotSource;

/// What happened to a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// A rebuild will start (now, or right after the running one).
    Scheduled,
    /// A rebuild was already queued; this request joins it.
    Coalesced,
    /// The worker is gone and nothing will be built.
    Stopped,
}

/// Progress of the rebuild task, as reported by `/health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildStatus {
    pub in_progress: bool,
    pub completed: u64,
    pub failed: u64,
    /// Message of the most recent build if it failed, cleared on success.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    /// Trigger a rebuild this often. `None` disables the timer.
    pub interval: Option<Duration>,
    /// Persist every published snapshot under this root's cache directory.
    pub persist_root: Option<PathBuf>,
}

const WORKER_STOPPED: &str = "rebuild worker has stopped";

/// Cheap, cloneable access to a running scheduler.
#[derive(Clone)]
pub struct RebuildHandle {
    trigger_tx: mpsc::Sender<()>,
    status: Arc<Mutex<RebuildStatus>>,
}

impl RebuildHandle {
    /// Request a rebuild without waiting for it.
    pub fn trigger(&self) -> TriggerOutcome {
        match self.trigger_tx.try_send(()) {
            Ok(()) => {
                debug!("Rebuild scheduled");
                TriggerOutcome::Scheduled
            }
            Err(TrySendError::Full(())) => {
                debug!("Rebuild already queued, coalescing");
                TriggerOutcome::Coalesced
            }
            Err(TrySendError::Closed(())) => {
                warn!("Rebuild worker has stopped, ignoring trigger");
                let mut status = lock(&self.status);
                status.in_progress = false;
                status.last_error = Some(WORKER_STOPPED.to_string());
                TriggerOutcome::Stopped
            }
        }
    }

    pub fn status(&self) -> RebuildStatus {
        lock(&self.status).clone()
    }
}

fn lock(status: &Mutex<RebuildStatus>) -> MutexGuard<'_, RebuildStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct RebuildScheduler {
    source: Arc<dyn SnapshotSource>,
    cell: Arc<SnapshotCell>,
    status: Arc<Mutex<RebuildStatus>>,
    options: RebuildOptions,
}

impl RebuildScheduler {
    /// Start the worker (and the timer, if configured) on the current tokio
    /// runtime. Nothing is built until the first trigger.
    pub fn spawn(source: Arc<dyn SnapshotSource>, cell: Arc<SnapshotCell>, options: RebuildOptions) -> RebuildHandle {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let status = Arc::new(Mutex::new(RebuildStatus::default()));
        let handle = RebuildHandle { trigger_tx, status: Arc::clone(&status) };

        if let Some(interval) = options.interval.filter(|d| !d.is_zero()) {
            let timer_handle = handle.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                // the first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    debug!("Periodic rebuild trigger");
                    timer_handle.trigger();
                }
            });
            info!("Periodic rebuild every {:?}", interval);
        }

        let scheduler = RebuildScheduler { source, cell, status, options };
        tokio::spawn(scheduler.run(trigger_rx));
        handle
    }

    async fn run(self, mut trigger_rx: mpsc::Receiver<()>) {
        while trigger_rx.recv().await.is_some() {
            self.rebuild_once().await;
        }
        debug!("Rebuild worker shutting down");
    }

    async fn rebuild_once(&self) {
        lock(&self.status).in_progress = true;
        let started = Instant::now();
        let previous = self.cell.current();

        let source = Arc::clone(&self.source);
        let base = Arc::clone(&previous);
        let result = tokio::task::spawn_blocking(move || source.build(&base)).await;

        let outcome = match result {
            Ok(Ok(next)) => {
                let diff = SnapshotDiff::between(&previous, &next);
                if diff.is_empty() {
                    info!("Published snapshot v{} in {}ms: no graph changes", next.version(), started.elapsed().as_millis());
                } else {
                    info!(
                        "Published snapshot v{} in {}ms: +{} -{} ~{} nodes, +{} -{} links ({} nodes touched)",
                        next.version(),
                        started.elapsed().as_millis(),
                        diff.added_nodes.len(),
                        diff.removed_nodes.len(),
                        diff.modified_nodes.len(),
                        diff.added_links.len(),
                        diff.removed_links.len(),
                        diff.touched_nodes().len()
                    );
                }
                self.cell.publish(next);
                self.persist().await;
                Ok(())
            }
            Ok(Err(err)) => Err(err.to_string()),
            Err(join_err) => Err(format!("rebuild task failed: {join_err}")),
        };

        let mut status = lock(&self.status);
        status.in_progress = false;
        match outcome {
            Ok(()) => {
                status.completed += 1;
                status.last_error = None;
            }
            Err(message) => {
                error!("Rebuild failed, still serving v{}: {}", previous.version(), message);
                status.failed += 1;
                status.last_error = Some(message);
            }
        }
    }

    async fn persist(&self) {
        let Some(root) = self.options.persist_root.clone() else {
            return;
        };
        let snapshot = self.cell.current();
        let saved = tokio::task::spawn_blocking(move || save_snapshot(&snapshot, &root)).await;
        match saved {
            Ok(Ok(())) => debug!("Snapshot persisted"),
            Ok(Err(err)) => warn!("Failed to persist snapshot: {}", err),
            Err(err) => warn!("Snapshot persistence task failed: {}", err),
        }
    }
}
