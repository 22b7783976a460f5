//! Configuration update and merging.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config_data::{Config, WatchConfig};

/// Partial configuration update that can be merged into a Config.
///
/// All fields are optional. Only specified fields override the base config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub src_dir: Option<PathBuf>,

    #[serde(default)]
    pub build_dir: Option<PathBuf>,

    #[serde(default)]
    pub archive_dir: Option<PathBuf>,

    #[serde(default)]
    pub lib_dir: Option<PathBuf>,

    #[serde(default)]
    pub input: Option<PathBuf>,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default)]
    pub dev_version: Option<String>,

    /// Replaces the whole watch table when present.
    #[serde(default)]
    pub watch: Option<WatchConfig>,
}

impl ConfigUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges this update into a base configuration, returning a new Config.
    pub fn merge_into(self, base: &Config) -> Config {
        Config {
            src_dir: self.src_dir.unwrap_or_else(|| base.src_dir.clone()),
            build_dir: self.build_dir.unwrap_or_else(|| base.build_dir.clone()),
            archive_dir: self.archive_dir.unwrap_or_else(|| base.archive_dir.clone()),
            lib_dir: self.lib_dir.unwrap_or_else(|| base.lib_dir.clone()),
            input: self.input.unwrap_or_else(|| base.input.clone()),
            debug: self.debug.unwrap_or(base.debug),
            dev_version: self.dev_version.unwrap_or_else(|| base.dev_version.clone()),
            watch: self.watch.unwrap_or_else(|| base.watch.clone()),
        }
    }
}

impl From<ConfigUpdate> for Config {
    fn from(update: ConfigUpdate) -> Self {
        update.merge_into(&Config::default())
    }
}
