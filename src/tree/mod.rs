//! Conversion between the nested object tree and the flat manifest.

mod builder;
mod flattener;

pub use builder::{entry_path, preflight, unreached_groups, TreeBuilder};
pub use flattener::{file_stem, flatten_nodes, CONTAINED_DIR};
