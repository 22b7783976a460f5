//! ttsave - split and merge tabletop save files
//!
//! A save file is one large JSON document: a tree of objects, each of which
//! may carry a Lua script, its persisted state, XML UI markup and a memo.
//! This library decomposes it into one file per object plus a manifest, and
//! reassembles it again.
//!
//! # Features
//!
//! - **Split**: write every object and payload to its own file, with a
//!   manifest recording parent and sibling order
//! - **Merge**: rebuild the save from the manifest, bundling `require`d Lua
//!   modules and `<Include>`d XML fragments
//! - **Watch**: rebuild a development save whenever a source file changes
//!
//! # Example
//!
//! ```no_run
//! use ttsave::interface::Context;
//! use ttsave::commands::{merge, MergeOptions};
//!
//! let ctx = Context::from_current_dir().unwrap();
//! let options = MergeOptions {
//!     version: "v1.0.0".to_string(),
//!     ..Default::default()
//! };
//! let output = merge(&ctx, options).unwrap();
//! println!("{}", output.display());
//! ```

pub mod bundle;
pub mod commands;
pub mod config;
pub mod errors;
pub mod interface;
pub mod io;
pub mod model;
pub mod names;
pub mod tree;
pub mod validate;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use errors::{Result, TtsError};
pub use interface::Context;
pub use model::{ManifestEntry, ManifestIndex, Node, SaveDocument};

// Re-export command options
pub use commands::{MergeOptions, SplitOptions, WatchOptions};
