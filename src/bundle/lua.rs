//! Lua module bundling.
//!
//! Scripts that `require` modules from the library directory are turned into
//! one self-contained script: a small module loader, one registration per
//! resolved module (dependencies first), the original script registered as
//! `__root`, and a final `return __bundle_require("__root")`.
//!
//! [`extract_root_module`] performs the inverse for `split`.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

use super::chain::ResolutionChain;
use crate::errors::{Result, TtsError};
use crate::io::FileCache;

/// Registration name of the entry script.
pub const ROOT_MODULE: &str = "__root";

/// Module file extensions, in lookup order.
pub const MODULE_EXTENSIONS: [&str; 2] = ["lua", "ttslua"];

/// Runtime loader emitted at the top of every bundle.
const LOADER: &str = include_str!("loader.lua");

/// Matches `require("id")`, `require 'id'` and `require"id"`.
static REQUIRE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s=(,;{])require\s*(?:\(\s*["']([^"']+)["']\s*\)|["']([^"']+)["'])"#)
        .unwrap()
});

/// Start of a luabundle-style root registration, up to the function body.
static ROOT_REGISTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)__bundle_register\(\s*["']__root["']\s*,\s*function\s*\([^)]*\)\s*"#)
        .unwrap()
});

static FUNCTION_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bend\)").unwrap());

/// What may follow the root registration's closing `end)`.
static AFTER_ROOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:__bundle_register|package\.preload|return\s+__bundle_require)").unwrap()
});

/// A `package.preload["__root"] = function(...) ... end` bundle.
static ROOT_PRELOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"package\.preload\[\s*["']__root["']\s*\]\s*=\s*function\s*\([^)]*\)\s*([\s\S]*?)\bend\b"#,
    )
    .unwrap()
});

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Returns the unique module ids required by `code`, in first-seen order.
pub fn find_require_ids(code: &str) -> Vec<String> {
    let ids: IndexSet<String> = REQUIRE_PATTERN
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect();
    ids.into_iter().collect()
}

/// A module read from the library directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module id as written in `require`.
    pub id: String,
    /// Source text.
    pub code: String,
}

/// Modules resolved for one bundle, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// Resolved modules, dependencies before dependents.
    pub modules: Vec<Module>,
    /// Circular require chains that were cut, e.g. `__root -> a -> b -> a`.
    pub cycles: Vec<String>,
    visited: HashSet<String>,
}

/// Resolves `require` calls against a module directory.
#[derive(Debug, Clone)]
pub struct ScriptBundler<'a> {
    fs: &'a dyn FileCache,
    lib_dir: PathBuf,
    debug: bool,
}

impl<'a> ScriptBundler<'a> {
    /// Creates a bundler reading modules from `lib_dir`.
    pub fn new(fs: &'a dyn FileCache, lib_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            lib_dir: lib_dir.into(),
            debug: false,
        }
    }

    /// Enables per-script debug logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Bundles `code` if it requires anything; otherwise returns it as is.
    ///
    /// `who` labels diagnostics, e.g. `Global` or `object:abc123`.
    pub fn bundle(&self, code: &str, who: &str) -> Result<String> {
        if find_require_ids(code).is_empty() {
            if self.debug {
                tracing::debug!("No requires in {}, bundling skipped", who);
            }
            return Ok(code.to_string());
        }

        let graph = self.resolve(code, who)?;
        if self.debug {
            tracing::debug!(
                "{}: bundled {} module(s) from {}",
                who,
                graph.modules.len(),
                self.lib_dir.display()
            );
        }
        Ok(emit_bundle(code, &graph.modules))
    }

    /// Resolves every module `code` needs, transitively.
    pub fn resolve(&self, code: &str, who: &str) -> Result<ModuleGraph> {
        let mut graph = ModuleGraph::default();
        let requires = find_require_ids(code);
        if requires.is_empty() {
            return Ok(graph);
        }

        if !self.fs.is_dir(&self.lib_dir) {
            return Err(TtsError::LibDirMissing {
                who: who.to_string(),
                lib_dir: self.lib_dir.clone(),
            });
        }

        let mut chain = ResolutionChain::rooted(ROOT_MODULE);
        for id in &requires {
            self.load_module(id, who, &mut chain, &mut graph)?;
        }
        Ok(graph)
    }

    fn load_module(
        &self,
        id: &str,
        who: &str,
        chain: &mut ResolutionChain,
        graph: &mut ModuleGraph,
    ) -> Result<()> {
        if !graph.visited.insert(id.to_string()) {
            return Ok(());
        }

        let path = self
            .resolve_module_path(id)
            .ok_or_else(|| TtsError::MissingModule {
                who: who.to_string(),
                id: id.to_string(),
                expected: format!(
                    "{}/{}.lua or .ttslua",
                    self.lib_dir.display(),
                    id
                ),
            })?;

        let code = self.fs.read(&path).map_err(|source| TtsError::ModuleRead {
            who: who.to_string(),
            id: id.to_string(),
            path: path.clone(),
            source,
        })?;

        if code.trim().is_empty() {
            return Err(TtsError::EmptyModule {
                who: who.to_string(),
                id: id.to_string(),
                path,
            });
        }

        chain.enter(id);
        for sub in find_require_ids(&code) {
            // A module requiring itself is already registered once it returns.
            if sub == id {
                continue;
            }
            if chain.contains(&sub) {
                let cycle = chain.describe_with(&sub);
                tracing::warn!("Circular require: {}", cycle);
                graph.cycles.push(cycle);
                continue;
            }
            self.load_module(&sub, who, chain, graph)?;
        }
        chain.exit();

        graph.modules.push(Module {
            id: id.to_string(),
            code,
        });
        Ok(())
    }

    /// Maps a module id to `<lib_dir>/<id>.lua`, falling back to `.ttslua`.
    pub fn resolve_module_path(&self, id: &str) -> Option<PathBuf> {
        let base = id
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.lib_dir.clone(), |acc, part| acc.join(part));

        MODULE_EXTENSIONS.iter().find_map(|ext| {
            let mut candidate = OsString::from(base.as_os_str());
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            (self.fs.exists(&candidate) && !self.fs.is_dir(&candidate)).then_some(candidate)
        })
    }
}

fn register_block(id: &str, code: &str) -> String {
    format!(
        "__bundle_register(\"{}\", function(require, _LOADED, __bundle_register, __bundle_modules)\n{}\nend)",
        id, code
    )
}

/// Emits the loader, the module registrations and the root registration.
fn emit_bundle(root_code: &str, modules: &[Module]) -> String {
    let mut out = Vec::with_capacity(modules.len() + 2);
    out.push(LOADER.trim_end().to_string());
    for module in modules {
        out.push(register_block(&module.id, &module.code));
    }
    out.push(format!(
        "{}\n\nreturn __bundle_require(\"{}\")",
        register_block(ROOT_MODULE, root_code),
        ROOT_MODULE
    ));
    out.join("\n\n")
}

/// Recovers the entry script from a bundle.
///
/// Recognizes luabundle registrations and `package.preload` bundles; any
/// other script is returned unchanged.
pub fn extract_root_module(lua: &str) -> String {
    if let Some(body) = registered_root_body(lua) {
        return tidy_lua(body);
    }

    if let Some(caps) = ROOT_PRELOAD.captures(lua) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        if !body.is_empty() {
            return tidy_lua(body);
        }
    }

    lua.to_string()
}

/// Finds the body of `__bundle_register("__root", function(...) ... end)`.
///
/// The body ends at the first `end)` that is followed by another
/// registration, a preload, the final `return __bundle_require` or the end
/// of input; earlier `end)` tokens belong to the script itself.
fn registered_root_body(lua: &str) -> Option<&str> {
    let start = ROOT_REGISTER.find(lua)?.end();
    let tail = &lua[start..];

    FUNCTION_END
        .find_iter(tail)
        .find(|m| {
            let rest = tail[m.end()..].trim_start();
            rest.is_empty() || AFTER_ROOT.is_match(rest)
        })
        .map(|m| &tail[..m.start()])
        .filter(|body| !body.is_empty())
}

/// Normalizes line endings, collapses blank runs and trims.
fn tidy_lua(s: &str) -> String {
    let unix = s.replace("\r\n", "\n");
    let collapsed = EXCESS_NEWLINES.replace_all(&unix, "\n\n");
    collapsed.trim_start().trim_end().to_string()
}
