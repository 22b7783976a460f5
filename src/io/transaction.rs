//! Deferred file operations.
//!
//! Split and merge record every write into a [`Transaction`] and only touch
//! the disk once all fatal checks have passed, so a failed run never leaves a
//! partial manifest or save file behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{Result, TtsError};

/// An action that can be executed as part of a transaction.
pub trait Action: std::fmt::Debug + Send + Sync {
    /// Returns the target path.
    fn target(&self) -> &Path;

    /// Checks that the action can run against the current disk state.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Executes the action.
    fn execute(&self) -> Result<()>;

    /// Returns a description of this action.
    fn describe(&self) -> String;

    /// Returns the content this action writes, if any.
    fn proposed_content(&self) -> Option<&str> {
        None
    }
}

/// Write a file, creating parent directories as needed.
#[derive(Debug)]
pub struct WriteFile {
    /// Target file path.
    pub path: PathBuf,
    /// Content to write.
    pub content: String,
}

impl WriteFile {
    /// Creates a new WriteFile action.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

impl Action for WriteFile {
    fn target(&self) -> &Path {
        &self.path
    }

    fn execute(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&self.path, &self.content)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("write {}", self.path.display())
    }

    fn proposed_content(&self) -> Option<&str> {
        Some(&self.content)
    }
}

/// Move a file, creating the destination directory as needed.
#[derive(Debug)]
pub struct MoveFile {
    /// Source path.
    pub from: PathBuf,
    /// Destination path.
    pub to: PathBuf,
}

impl MoveFile {
    /// Creates a new MoveFile action.
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Action for MoveFile {
    fn target(&self) -> &Path {
        &self.to
    }

    fn check(&self) -> Result<()> {
        if !self.from.is_file() {
            return Err(TtsError::MissingFile {
                path: self.from.clone(),
            });
        }
        Ok(())
    }

    fn execute(&self) -> Result<()> {
        if let Some(parent) = self.to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&self.from, &self.to)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("move {} -> {}", self.from.display(), self.to.display())
    }
}

/// Empty a directory without removing it, creating it if missing.
#[derive(Debug)]
pub struct CleanDir {
    /// Directory to clean.
    pub path: PathBuf,
}

impl CleanDir {
    /// Creates a new CleanDir action.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Action for CleanDir {
    fn target(&self) -> &Path {
        &self.path
    }

    fn check(&self) -> Result<()> {
        if self.path.exists() && !self.path.is_dir() {
            return Err(TtsError::Config(format!(
                "{} exists and is not a directory",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn execute(&self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("clean {}", self.path.display())
    }
}

/// An ordered collection of actions executed together.
#[derive(Debug, Default)]
pub struct Transaction {
    actions: Vec<Box<dyn Action>>,
}

impl Transaction {
    /// Creates a new empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Adds an action to the transaction.
    pub fn add(&mut self, action: impl Action + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Adds a write action.
    pub fn write(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.add(WriteFile::new(path, content));
    }

    /// Adds a move action.
    pub fn move_file(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) {
        self.add(MoveFile::new(from, to));
    }

    /// Adds a clean-directory action.
    pub fn clean_dir(&mut self, path: impl Into<PathBuf>) {
        self.add(CleanDir::new(path));
    }

    /// Returns the number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if there are no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns descriptions of all actions.
    pub fn describe(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.describe()).collect()
    }

    /// Returns the path and content of every file this transaction writes.
    pub fn written_files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.actions
            .iter()
            .filter_map(|a| a.proposed_content().map(|c| (a.target(), c)))
    }

    /// Returns the content that would be written to `path`, if any.
    pub fn content_of(&self, path: &Path) -> Option<&str> {
        self.written_files()
            .filter(|(p, _)| *p == path)
            .map(|(_, c)| c)
            .last()
    }

    /// Checks all actions before anything is executed.
    pub fn check(&self) -> Result<()> {
        for action in &self.actions {
            action.check()?;
        }
        Ok(())
    }

    /// Checks, then executes all actions in order.
    pub fn execute(&self) -> Result<()> {
        self.check()?;

        for action in &self.actions {
            tracing::debug!("{}", action.describe());
            action.execute()?;
        }

        Ok(())
    }
}

/// Counter for unique temp file names.
static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Writes content to a file atomically using a temp file.
fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_path = parent.join(format!(".ttsave-tmp-{}-{}", std::process::id(), counter));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}
