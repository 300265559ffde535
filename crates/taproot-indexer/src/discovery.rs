//! Source tree discovery
//!
//! Walks the root once and produces the tree listing every later stage
//! resolves against. Nothing after discovery touches directory metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;
use serde::Deserialize;
use taproot_core::{BuildWarning, CACHE_DIR, Language};

use crate::config::BuildConfig;

/// A file that will become a node, unless reading or parsing it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Root-relative, `/`-separated.
    pub path: String,
    pub absolute: PathBuf,
    pub language: Language,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct Discovery {
    /// Every non-excluded file under the root, indexed or not.
    pub listing: BTreeSet<String>,
    /// Files in an indexed language, sorted by path.
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<BuildWarning>,
    /// Indexed-language files that were left out (oversize).
    pub skipped: usize,
    /// Library crates in the tree, by the name `use` refers to them with,
    /// mapped to their `src` directory.
    pub crates: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct Manifest {
    package: Option<Package>,
}

#[derive(Deserialize)]
struct Package {
    name: Option<String>,
}

pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

pub fn discover(root: &Path, config: &BuildConfig) -> Result<Discovery> {
    let exclude = config.exclude_set()?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .parents(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .git_ignore(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .require_git(false)
        .follow_links(false)
        .filter_entry(|entry| {
            let name = entry.file_name();
            name != ".git" && name != CACHE_DIR
        });

    let mut discovery = Discovery::default();

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(path) = relative_path(root, entry.path()) else {
            tracing::debug!("Skipping non UTF-8 path {}", entry.path().display());
            continue;
        };
        if exclude.is_match(&path) {
            continue;
        }

        discovery.listing.insert(path.clone());

        let language = Language::from_path(&path);
        if !language.is_indexed() {
            continue;
        }
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                discovery.warnings.push(BuildWarning {
                    path,
                    message: format!("cannot read metadata: {err}"),
                });
                discovery.skipped += 1;
                continue;
            }
        };
        if size > config.max_file_size {
            discovery.warnings.push(BuildWarning {
                path,
                message: format!("file is {size} bytes, above the {} byte limit", config.max_file_size),
            });
            discovery.skipped += 1;
            continue;
        }
        discovery.candidates.push(Candidate {
            path,
            absolute: entry.into_path(),
            language,
            size,
        });
    }

    discovery.candidates.sort_by(|a, b| a.path.cmp(&b.path));
    discovery.crates = library_crates(root, &discovery.listing);
    Ok(discovery)
}

/// Every `Cargo.toml` in the listing that declares a package with a
/// `src/lib.rs`. A manifest that does not parse falls back to its
/// directory name; a virtual workspace manifest declares no crate.
fn library_crates(root: &Path, listing: &BTreeSet<String>) -> BTreeMap<String, String> {
    let mut crates = BTreeMap::new();
    for manifest in listing.iter().filter(|path| path.rsplit('/').next() == Some("Cargo.toml")) {
        let dir = crate::resolver::parent(manifest);
        let src = if dir.is_empty() { "src".to_string() } else { format!("{dir}/src") };
        if !listing.contains(&format!("{src}/lib.rs")) {
            continue;
        }

        let dir_name = || {
            let name = match dir.rsplit_once('/') {
                Some((_, name)) => Some(name.to_string()),
                None if dir.is_empty() => root.file_name().and_then(|n| n.to_str()).map(str::to_string),
                None => Some(dir.to_string()),
            };
            name.filter(|name| !name.is_empty())
        };
        let name = match std::fs::read_to_string(root.join(manifest)) {
            Ok(text) => match toml::from_str::<Manifest>(&text) {
                Ok(Manifest { package: None }) => None,
                Ok(Manifest { package: Some(package) }) => package.name.or_else(dir_name),
                Err(err) => {
                    tracing::debug!("Unparseable manifest {}: {}", manifest, err);
                    dir_name()
                }
            },
            Err(err) => {
                tracing::debug!("Cannot read manifest {}: {}", manifest, err);
                dir_name()
            }
        };
        if let Some(name) = name {
            crates.insert(name.replace('-', "_"), src);
        }
    }
    crates
}
