//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use taproot_core::{
    Direction, ImpactQuery, Relation, Snapshot, SnapshotCell, clear_cache, load_snapshot, save_snapshot,
};
use taproot_indexer::Builder;
use taproot_rebuild::{RebuildScheduler, TreeSource};
use taproot_server::{NodeRef, QueryService, ServerState, TaprootServer};

use crate::settings::Settings;

pub async fn serve(root: PathBuf, settings: Settings) -> anyhow::Result<()> {
    tracing::info!("Starting taproot server for {}", root.display());

    let initial = load_cached(&root).unwrap_or_else(Snapshot::empty);
    let cell = Arc::new(SnapshotCell::new(initial));

    let source = Arc::new(TreeSource::new(root.clone(), Builder::new(settings.build.clone())));
    let rebuild = RebuildScheduler::spawn(source, Arc::clone(&cell), settings.rebuild_options(&root));
    // queries are served from the cached snapshot (or an empty one) meanwhile
    rebuild.trigger();

    let state = ServerState::new(cell, rebuild, settings.query.max_depth_cap);
    TaprootServer::new(state, settings.server_config()).start().await
}

pub async fn index(root: PathBuf, settings: Settings) -> anyhow::Result<()> {
    tracing::info!("Indexing repository: {}", root.display());

    let snapshot = build(root, settings).await?;
    let stats = snapshot.stats();
    println!(
        "Snapshot v{}: {} nodes, {} links",
        snapshot.version(),
        snapshot.store().node_count(),
        snapshot.store().link_count()
    );
    println!(
        "{} files seen, {} parsed, {} reused, {} skipped, {} unresolved references ({} ms)",
        stats.files_seen, stats.parsed, stats.reused, stats.skipped, stats.unresolved, stats.elapsed_ms
    );
    for warning in snapshot.warnings() {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    Ok(())
}

pub async fn search(
    root: PathBuf,
    settings: Settings,
    terms: String,
    limit: usize,
    offset: usize,
) -> anyhow::Result<()> {
    let service = query_service(root, settings).await?;
    let results = service.search(&terms, limit, offset)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

pub async fn impact(
    root: PathBuf,
    settings: Settings,
    path: String,
    direction: String,
    max_depth: Option<u32>,
    relations: Vec<String>,
) -> anyhow::Result<()> {
    let mut query = ImpactQuery::incoming().direction(direction.parse::<Direction>()?);
    if let Some(depth) = max_depth {
        query = query.max_depth(depth);
    }
    if !relations.is_empty() {
        let relations = relations
            .iter()
            .map(|relation| relation.parse::<Relation>())
            .collect::<Result<Vec<_>, _>>()?;
        query = query.relations(relations);
    }

    let service = query_service(root, settings).await?;
    let results = service.impact(&NodeRef::Path(path), &query)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());

    clear_cache(&root).with_context(|| format!("failed to clear cache under {}", root.display()))?;

    println!("Cache cleared");
    Ok(())
}

/// The cached snapshot under `root`, if there is a usable one.
fn load_cached(root: &Path) -> Option<Snapshot> {
    match load_snapshot(root) {
        Ok(Some(snapshot)) => {
            tracing::info!("Loaded cached snapshot v{}", snapshot.version());
            Some(snapshot)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable cache: {}", e);
            None
        }
    }
}

/// Build incrementally from the cache and persist the result.
async fn build(root: PathBuf, settings: Settings) -> anyhow::Result<Snapshot> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<Snapshot> {
        let previous = load_cached(&root);
        let builder = Builder::new(settings.build.clone());
        let snapshot = builder.build(&root, previous.as_ref())?;
        if settings.rebuild.persist {
            if let Err(e) = save_snapshot(&snapshot, &root) {
                tracing::warn!("Failed to persist snapshot: {}", e);
            }
        }
        Ok(snapshot)
    })
    .await
    .context("build task failed")?
}

async fn query_service(root: PathBuf, settings: Settings) -> anyhow::Result<QueryService> {
    let depth_cap = settings.query.max_depth_cap;
    let snapshot = build(root, settings).await?;
    Ok(QueryService::new(Arc::new(SnapshotCell::new(snapshot))).with_depth_cap(depth_cap))
}
