//! Build configuration, the `[build]` section of `taproot.toml`

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

fn default_exclude() -> Vec<String> {
    vec!["target/**".into(), "node_modules/**".into(), "**/*.min.js".into()]
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Globs, relative to the root, of files left out of the graph.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped with a warning.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
    /// Parser threads; 0 picks one per core.
    pub parser_workers: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            respect_gitignore: true,
            parser_workers: 0,
        }
    }
}

impl BuildConfig {
    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).with_context(|| format!("invalid exclude pattern `{pattern}`"))?;
            builder.add(glob);
        }
        builder.build().context("failed to compile exclude patterns")
    }
}
