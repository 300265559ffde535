//! Incremental graph builder
//!
//! A build walks the tree, fingerprints every candidate file and reuses the
//! previous snapshot's record when the fingerprint is unchanged. Only new or
//! changed files are read as text and parsed. Nodes and links are then
//! assembled from all records against the fresh tree listing, so links to
//! files that disappeared are dropped even when the referring file did not
//! change.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use taproot_core::{
    BuildStats, BuildWarning, Error, FileRecord, Fingerprint, GraphStore, Link, Node, NodeId, NodeKind, Relation,
    Result, Snapshot,
};

use crate::config::BuildConfig;
use crate::discovery::{Candidate, discover};
use crate::languages::get_extractor;
use crate::parser_pool::ParserPool;
use crate::resolver::{Resolution, Resolver};

enum Outcome {
    Reused(Arc<FileRecord>),
    Parsed(Arc<FileRecord>),
    Skipped(BuildWarning),
}

pub struct Builder {
    config: BuildConfig,
    parser_pool: ParserPool,
}

impl Builder {
    pub fn new(config: BuildConfig) -> Self {
        let parser_pool = match config.parser_workers {
            0 => crate::parser_pool::create_parser_pool(),
            n => ParserPool::new(n),
        };
        Self { config, parser_pool }
    }

    pub fn with_parser_pool(config: BuildConfig, parser_pool: ParserPool) -> Self {
        Self { config, parser_pool }
    }

    /// Build a snapshot of the tree at `root`.
    ///
    /// With a `previous` snapshot the build is incremental and the new
    /// version is one above it; otherwise the version is 1.
    pub fn build(&self, root: &Path, previous: Option<&Snapshot>) -> Result<Snapshot> {
        let started = Instant::now();

        if !root.is_dir() {
            return Err(Error::BuildFailure(format!("{} is not a readable directory", root.display())));
        }

        let discovery = discover(root, &self.config).map_err(|e| Error::BuildFailure(format!("{e:#}")))?;
        if discovery.candidates.is_empty() {
            return Err(Error::BuildFailure(format!("no indexable files under {}", root.display())));
        }

        tracing::debug!(
            "Discovered {} files, {} indexable",
            discovery.listing.len(),
            discovery.candidates.len()
        );

        let outcomes: Vec<Outcome> = discovery
            .candidates
            .par_iter()
            .map(|candidate| self.process(candidate, previous))
            .collect();

        let mut stats = BuildStats {
            files_seen: discovery.candidates.len() + discovery.skipped,
            skipped: discovery.skipped,
            ..BuildStats::default()
        };
        let mut warnings = discovery.warnings;
        let mut records = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Outcome::Reused(record) => {
                    stats.reused += 1;
                    records.push(record);
                }
                Outcome::Parsed(record) => {
                    stats.parsed += 1;
                    records.push(record);
                }
                Outcome::Skipped(warning) => {
                    tracing::warn!("Skipping {}: {}", warning.path, warning.message);
                    stats.skipped += 1;
                    warnings.push(warning);
                }
            }
        }
        warnings.sort_by(|a, b| a.path.cmp(&b.path));

        let (store, unresolved) = assemble(&records, &discovery.listing, &discovery.crates)?;
        stats.unresolved = unresolved;
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        let version = previous.map_or(1, |snapshot| snapshot.version() + 1);
        tracing::info!(
            "Built snapshot v{}: {} nodes, {} links ({} parsed, {} reused, {} skipped, {} unresolved) in {}ms",
            version,
            store.node_count(),
            store.link_count(),
            stats.parsed,
            stats.reused,
            stats.skipped,
            stats.unresolved,
            stats.elapsed_ms
        );

        Ok(Snapshot::new(version, store, records, warnings, stats))
    }

    fn process(&self, candidate: &Candidate, previous: Option<&Snapshot>) -> Outcome {
        let skip = |message: String| {
            Outcome::Skipped(BuildWarning { path: candidate.path.clone(), message })
        };

        let bytes = match fs::read(&candidate.absolute) {
            Ok(bytes) => bytes,
            Err(err) => return skip(format!("cannot read file: {err}")),
        };
        let fingerprint = Fingerprint::of(&bytes);

        if let Some(record) = previous.and_then(|snapshot| snapshot.record(&candidate.path)) {
            if record.fingerprint == fingerprint && record.language == candidate.language {
                return Outcome::Reused(Arc::clone(record));
            }
        }

        let Ok(source) = String::from_utf8(bytes) else {
            return skip("file is not valid UTF-8".to_string());
        };
        let Some(extractor) = get_extractor(candidate.language, &self.parser_pool) else {
            return skip(format!("no extractor for {:?}", candidate.language));
        };
        let extraction = match extractor.extract(&candidate.path, &source) {
            Ok(extraction) => extraction,
            Err(err) => return skip(format!("cannot parse: {err:#}")),
        };
        if extraction.parse_errors {
            tracing::debug!("{} parsed with syntax errors", candidate.path);
        }

        Outcome::Parsed(Arc::new(FileRecord {
            path: candidate.path.clone(),
            language: candidate.language,
            size: candidate.size,
            fingerprint,
            symbols: extraction.symbols,
            dependencies: extraction.dependencies,
            doc_terms: extraction.doc_terms,
            parse_errors: extraction.parse_errors,
        }))
    }
}

fn file_node(record: &FileRecord) -> Node {
    let mut node = Node::new(NodeKind::File, record.path.as_str()).with_terms(&record.path);
    for symbol in &record.symbols {
        node.add_terms(&symbol.name);
    }
    for term in &record.doc_terms {
        node.add_terms(term);
    }
    node.metadata.language = Some(record.language);
    node.metadata.size = Some(record.size);
    node.metadata.fingerprint = Some(record.fingerprint);
    node.metadata.parse_errors = record.parse_errors;
    node
}

/// Turn records into a graph, resolving every dependency against `listing`.
/// Returns the store and the number of in-tree references left unresolved.
fn assemble(
    records: &[Arc<FileRecord>],
    listing: &BTreeSet<String>,
    crates: &BTreeMap<String, String>,
) -> Result<(GraphStore, usize)> {
    let resolver = Resolver::new(listing).with_crates(crates);
    let indexed: BTreeSet<&str> = records.iter().map(|record| record.path.as_str()).collect();

    let mut nodes = Vec::new();
    let mut externals: BTreeMap<String, Node> = BTreeMap::new();
    let mut links = Vec::new();
    let mut unresolved = 0;

    for record in records {
        let file = file_node(record);
        let file_id = file.id;
        nodes.push(file);

        for symbol in &record.symbols {
            let mut node = Node::new(NodeKind::Symbol, format!("{}#{}", record.path, symbol.name))
                .with_terms(&symbol.name);
            node.metadata.language = Some(record.language);
            node.metadata.symbol_kind = Some(symbol.kind);
            node.metadata.line = Some(symbol.line);
            links.push(Link::new(file_id, node.id, Relation::Defines).at_line(symbol.line));
            nodes.push(node);
        }

        for dependency in &record.dependencies {
            let relation = dependency.spec.relation();
            for resolution in resolver.resolve(&record.path, &dependency.spec) {
                let target = match resolution {
                    Resolution::Internal(path) if path == record.path => continue,
                    Resolution::Internal(path) if indexed.contains(path.as_str()) => {
                        NodeId::new(NodeKind::File, &path)
                    }
                    Resolution::Internal(path) => {
                        tracing::debug!("{}:{} refers to {} which is not indexed", record.path, dependency.line, path);
                        unresolved += 1;
                        continue;
                    }
                    Resolution::External(name) => {
                        externals
                            .entry(name.clone())
                            .or_insert_with(|| {
                                let mut node = Node::new(NodeKind::External, name.as_str()).with_terms(&name);
                                node.metadata.language = Some(record.language);
                                node
                            })
                            .id
                    }
                    Resolution::Missing => {
                        tracing::debug!("{}:{} has an unresolved {:?}", record.path, dependency.line, dependency.spec);
                        unresolved += 1;
                        continue;
                    }
                };
                links.push(Link::new(file_id, target, relation).at_line(dependency.line));
            }
        }
    }

    let mut store = GraphStore::new();
    store.put_nodes(nodes)?;
    store.put_nodes(externals.into_values())?;
    store.put_links(links)?;
    Ok((store, unresolved))
}
