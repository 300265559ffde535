//! Layered configuration: `taproot.toml` at the indexed root, then
//! `TAPROOT_*` environment variables, then command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use taproot_core::DEFAULT_DEPTH_CAP;
use taproot_indexer::BuildConfig;
use taproot_rebuild::RebuildOptions;
use taproot_server::ServerConfig;

pub const CONFIG_FILE: &str = "taproot.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub build: BuildConfig,
    pub server: ServerSettings,
    pub query: QuerySettings,
    pub rebuild: RebuildSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self { host: defaults.host, port: defaults.port }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Depth used by impact queries that give none, and the most any may ask for.
    pub max_depth_cap: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { max_depth_cap: DEFAULT_DEPTH_CAP }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RebuildSettings {
    /// Seconds between periodic rebuilds, 0 disables them.
    pub interval_secs: u64,
    /// Keep the latest snapshot in `.taproot/` so restarts are incremental.
    pub persist: bool,
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self { interval_secs: 0, persist: true }
    }
}

impl Settings {
    /// Read `taproot.toml` under `root` if present, then apply the environment.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut settings = if path.is_file() {
            let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let settings = Self::from_toml(&text).with_context(|| format!("invalid {}", path.display()))?;
            tracing::debug!("Loaded settings from {}", path.display());
            settings
        } else {
            Self::default()
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("TAPROOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TAPROOT_PORT") {
            self.server.port = port.parse().with_context(|| format!("TAPROOT_PORT is not a port: {port}"))?;
        }
        if let Some(secs) = lookup("TAPROOT_REBUILD_INTERVAL_SECS") {
            self.rebuild.interval_secs = secs
                .parse()
                .with_context(|| format!("TAPROOT_REBUILD_INTERVAL_SECS is not a number: {secs}"))?;
        }
        if let Some(cap) = lookup("TAPROOT_MAX_DEPTH_CAP") {
            self.query.max_depth_cap =
                cap.parse().with_context(|| format!("TAPROOT_MAX_DEPTH_CAP is not a number: {cap}"))?;
        }
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig { host: self.server.host.clone(), port: self.server.port }
    }

    pub fn rebuild_options(&self, root: &Path) -> RebuildOptions {
        RebuildOptions {
            interval: (self.rebuild.interval_secs > 0).then(|| Duration::from_secs(self.rebuild.interval_secs)),
            persist_root: self.rebuild.persist.then(|| root.to_path_buf()),
        }
    }
}
