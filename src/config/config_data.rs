//! Configuration data structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for ttsave.
///
/// Relative paths are resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Split layout directory (`manifest.json`, `base.json`, `Global/`, objects).
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,

    /// Directory merged save files are written to.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Directory superseded builds are moved to.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Lua module library searched by `require`.
    #[serde(default = "default_lib_dir")]
    pub lib_dir: PathBuf,

    /// Save file read by `split` when no input is given.
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Extra diagnostics while merging.
    #[serde(default)]
    pub debug: bool,

    /// Version tag used by `watch` rebuilds.
    #[serde(default = "default_dev_version")]
    pub dev_version: String,

    /// Watch configuration.
    #[serde(default)]
    pub watch: WatchConfig,
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("archive")
}

fn default_lib_dir() -> PathBuf {
    PathBuf::from("lib")
}

fn default_input() -> PathBuf {
    PathBuf::from("Save.json")
}

fn default_dev_version() -> String {
    "vDEV".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            build_dir: default_build_dir(),
            archive_dir: default_archive_dir(),
            lib_dir: default_lib_dir(),
            input: default_input(),
            debug: false,
            dev_version: default_dev_version(),
            watch: WatchConfig::default(),
        }
    }
}

/// Watch mode configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Glob patterns of paths whose changes are ignored.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_debounce() -> u64 {
    100
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/*.swp".to_string(),
        "**/.DS_Store".to_string(),
        "**/*.tmp".to_string(),
    ]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            exclude: default_exclude(),
        }
    }
}
