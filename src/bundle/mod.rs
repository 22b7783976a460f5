//! Payload bundlers: Lua `require` resolution and XML `<Include>` expansion.

mod chain;
pub mod lua;
pub mod xml;

pub use chain::ResolutionChain;
pub use lua::{extract_root_module, find_require_ids, Module, ModuleGraph, ScriptBundler};
pub use xml::{unbundle, unbundle_to_files, MarkupBundler, UnbundledMarkup};
