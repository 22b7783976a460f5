//! Error types for ttsave.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for split, merge and bundling operations.
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("File not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("GUID mismatch at {file}: manifest has {manifest}, file has {found}")]
    GuidMismatch {
        file: String,
        manifest: String,
        found: String,
    },

    #[error("{who}: require(...) found, but the module directory is missing: {}", .lib_dir.display())]
    LibDirMissing { who: String, lib_dir: PathBuf },

    #[error("{who}: missing Lua module \"{id}\", expected {expected}")]
    MissingModule {
        who: String,
        id: String,
        expected: String,
    },

    #[error("{who}: failed to read module \"{id}\" at {}: {source}", .path.display())]
    ModuleRead {
        who: String,
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{who}: module \"{id}\" is empty at {}", .path.display())]
    EmptyModule {
        who: String,
        id: String,
        path: PathBuf,
    },

    #[error("Validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("A version tag is required, e.g. --version 1.2.0")]
    MissingVersion,

    #[error("Watch error: {0}")]
    Watch(String),
}

/// Result type alias for ttsave operations.
pub type Result<T> = std::result::Result<T, TtsError>;
