//! Execution context shared by the commands.

mod context;

pub use context::Context;
