//! File system abstraction for testability.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::transaction::Transaction;

/// Read-only file access used by the merge pipeline and the bundlers.
pub trait FileCache: Send + Sync + std::fmt::Debug {
    /// Reads the contents of a file.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Checks if a file or directory exists.
    fn exists(&self, path: &Path) -> bool;

    /// Checks if a directory exists.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Real file system implementation.
#[derive(Debug, Clone, Default)]
pub struct RealFileCache {
    /// Base directory for relative paths.
    pub base_dir: PathBuf,
}

impl RealFileCache {
    /// Creates a new RealFileCache with the given base directory.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolves a path relative to the base directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl FileCache for RealFileCache {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.resolve(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path).is_dir()
    }
}

/// In-memory file system for tests.
///
/// Directories exist implicitly whenever a file lives below them.
#[derive(Debug, Clone, Default)]
pub struct VirtualFS {
    files: BTreeMap<PathBuf, String>,
}

impl VirtualFS {
    /// Creates a new empty virtual file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file to the virtual file system.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Adds every file a transaction would write.
    pub fn load_writes(&mut self, transaction: &Transaction) {
        for (path, content) in transaction.written_files() {
            self.add_file(path, content);
        }
    }

    /// Returns the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there are no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileCache for VirtualFS {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_real_file_cache() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/util.lua"), "return {}").unwrap();

        let cache = RealFileCache::new(dir.path().to_path_buf());
        assert_eq!(cache.read(Path::new("lib/util.lua")).unwrap(), "return {}");
        assert!(cache.exists(Path::new("lib/util.lua")));
        assert!(cache.is_dir(Path::new("lib")));
        assert!(!cache.is_dir(Path::new("lib/util.lua")));
        assert!(!cache.exists(Path::new("missing.lua")));
    }

    #[test]
    fn test_virtual_fs() {
        let mut vfs = VirtualFS::new();
        vfs.add_file("src/Global/UI/panel.xml", "<Panel/>");

        assert_eq!(vfs.read(Path::new("src/Global/UI/panel.xml")).unwrap(), "<Panel/>");
        assert!(vfs.exists(Path::new("src/Global/UI/panel.xml")));
        assert!(vfs.is_dir(Path::new("src/Global")));
        assert!(vfs.is_dir(Path::new("src/Global/UI")));
        assert!(!vfs.is_dir(Path::new("src/Global/UI/panel.xml")));
        assert!(!vfs.exists(Path::new("src/Glob")));
        assert!(vfs.read(Path::new("nope.xml")).is_err());
    }
}
