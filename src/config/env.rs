//! Environment overrides.

use std::path::PathBuf;

use super::config_data::Config;
use super::config_update::ConfigUpdate;

/// Overrides read from the process environment (after `.env` is loaded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `INPUT_SAVE`
    pub input: Option<PathBuf>,
    /// `SRC_DIR`
    pub src_dir: Option<PathBuf>,
    /// `BUILD_DIR`
    pub build_dir: Option<PathBuf>,
    /// `ARCHIVE_DIR`
    pub archive_dir: Option<PathBuf>,
    /// `LIB_DIR`
    pub lib_dir: Option<PathBuf>,
    /// `CI` or `GITHUB_ACTIONS` set to `true`.
    pub ci: bool,
}

impl EnvOverrides {
    /// Reads the overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Reads the overrides from `(name, value)` pairs. Empty values are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut env = Self::default();
        for (key, value) in vars {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "INPUT_SAVE" => env.input = Some(PathBuf::from(value)),
                "SRC_DIR" => env.src_dir = Some(PathBuf::from(value)),
                "BUILD_DIR" => env.build_dir = Some(PathBuf::from(value)),
                "ARCHIVE_DIR" => env.archive_dir = Some(PathBuf::from(value)),
                "LIB_DIR" => env.lib_dir = Some(PathBuf::from(value)),
                "CI" | "GITHUB_ACTIONS" => env.ci |= value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        env
    }

    /// Returns true when running under continuous integration.
    pub fn is_ci(&self) -> bool {
        self.ci
    }

    /// Applies the path overrides on top of `base`.
    pub fn apply(&self, base: &Config) -> Config {
        ConfigUpdate {
            src_dir: self.src_dir.clone(),
            build_dir: self.build_dir.clone(),
            archive_dir: self.archive_dir.clone(),
            lib_dir: self.lib_dir.clone(),
            input: self.input.clone(),
            ..Default::default()
        }
        .merge_into(base)
    }
}
