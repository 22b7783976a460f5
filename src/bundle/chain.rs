//! Resolution chain used to detect include and require cycles.

use std::collections::HashSet;

/// The ancestors of the item currently being resolved.
///
/// Cycle scope is the chain, not everything seen so far: the same target may
/// appear in two sibling branches, but never inside itself.
#[derive(Debug, Clone, Default)]
pub struct ResolutionChain {
    /// Names in resolution order, for diagnostics.
    stack: Vec<String>,
    /// Set for O(1) membership checks.
    seen: HashSet<String>,
}

impl ResolutionChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain starting at `root`.
    pub fn rooted(root: &str) -> Self {
        let mut chain = Self::new();
        chain.enter(root);
        chain
    }

    /// Returns true if `name` is already on the chain.
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Pushes `name` onto the chain.
    pub fn enter(&mut self, name: &str) {
        self.seen.insert(name.to_string());
        self.stack.push(name.to_string());
    }

    /// Pops the innermost name.
    pub fn exit(&mut self) {
        if let Some(name) = self.stack.pop() {
            self.seen.remove(&name);
        }
    }

    /// Formats the chain extended by `next`, e.g. `__root -> a -> b -> a`.
    pub fn describe_with(&self, next: &str) -> String {
        let mut parts: Vec<&str> = self.stack.iter().map(String::as_str).collect();
        parts.push(next);
        parts.join(" -> ")
    }
}
