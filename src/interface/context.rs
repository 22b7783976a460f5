//! Execution context for ttsave operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, EnvOverrides};
use crate::io::{FileCache, RealFileCache};

/// Context for split, merge and watch.
///
/// Contains configuration, environment and file system access.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration, with environment overrides applied.
    pub config: Config,
    /// Environment the context was created with.
    pub env: EnvOverrides,
    /// File cache for reading files.
    pub file_cache: Arc<dyn FileCache>,
    /// Base directory for operations.
    pub base_dir: PathBuf,
}

impl Context {
    /// Creates a new context. Environment path overrides win over `config`.
    pub fn new(config: Config, env: EnvOverrides, base_dir: PathBuf) -> Self {
        let config = env.apply(&config);
        let file_cache = Arc::new(RealFileCache::new(base_dir.clone()));

        Self {
            config,
            env,
            file_cache,
            base_dir,
        }
    }

    /// Creates a context with default configuration and no environment.
    pub fn default_for_dir(base_dir: PathBuf) -> Self {
        Self::new(Config::default(), EnvOverrides::default(), base_dir)
    }

    /// Creates a context from the current directory, its configuration file
    /// and the process environment.
    pub fn from_current_dir() -> crate::errors::Result<Self> {
        let base_dir = std::env::current_dir()?;
        let config = crate::config::read_config(&base_dir)?;
        Ok(Self::new(config, EnvOverrides::from_env(), base_dir))
    }

    /// Replaces the file cache, e.g. with a `VirtualFS` in tests.
    #[must_use]
    pub fn with_file_cache(mut self, file_cache: Arc<dyn FileCache>) -> Self {
        self.file_cache = file_cache;
        self
    }

    /// Resolves a path relative to the base directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Returns the resolved split layout directory.
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.src_dir)
    }

    /// Returns the resolved build directory.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.build_dir)
    }

    /// Returns the resolved archive directory.
    pub fn archive_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.archive_dir)
    }

    /// Returns the resolved Lua module library.
    pub fn lib_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.lib_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path() {
        let dir = tempdir().unwrap();
        let ctx = Context::default_for_dir(dir.path().to_path_buf());

        let resolved = ctx.resolve_path(Path::new("src/manifest.json"));
        assert_eq!(resolved, dir.path().join("src/manifest.json"));

        let absolute = Path::new("/absolute/path");
        assert_eq!(ctx.resolve_path(absolute), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_env_overrides_config() {
        let dir = tempdir().unwrap();
        let env = EnvOverrides::from_vars([("SRC_DIR", "mod"), ("CI", "true")]);
        let ctx = Context::new(Config::default(), env, dir.path().to_path_buf());

        assert_eq!(ctx.src_dir(), dir.path().join("mod"));
        assert_eq!(ctx.build_dir(), dir.path().join("build"));
        assert!(ctx.env.is_ci());
    }
}
