//! XML include bundling.
//!
//! Bundling replaces every `<Include src="name"/>` line with the named file,
//! re-indented to the tag's indentation and wrapped in a pair of identical
//! `<!-- include name -->` marker comments. Unbundling walks those markers
//! back into separate fragments.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::chain::ResolutionChain;
use crate::errors::Result;
use crate::io::{FileCache, Transaction};

/// Text that marks a bundled document.
pub const BUNDLE_MARKER: &str = "<!-- include ";

/// Text that marks a document with includes to resolve.
pub const INCLUDE_TAG: &str = "<Include src=";

/// File name of the root fragment when unbundling.
pub const ROOT_FILE: &str = "UI.xml";

/// Directory (next to [`ROOT_FILE`]) holding the other fragments.
pub const FRAGMENT_DIR: &str = "UI";

static INCLUDE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(\s*)<Include src="([^"]+)"\s*/>"#).unwrap());

static MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)<!-- include ([^ ]+) -->").unwrap());

/// Returns true if `xml` contains bundle markers.
pub fn is_bundled(xml: &str) -> bool {
    xml.contains(BUNDLE_MARKER)
}

/// Returns true if `xml` contains include tags.
pub fn has_includes(xml: &str) -> bool {
    xml.contains(INCLUDE_TAG)
}

/// Normalizes an include target so it cannot leave the include directory.
///
/// `..`, `.` and empty segments are dropped and separators become `/`.
pub fn clean_target(src: &str) -> String {
    src.split(['/', '\\'])
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Appends `.xml` unless the target already has it.
pub fn target_file_name(target: &str) -> String {
    if target.ends_with(".xml") {
        target.to_string()
    } else {
        format!("{}.xml", target)
    }
}

/// Expands include tags against a directory of fragments.
#[derive(Debug, Clone)]
pub struct MarkupBundler<'a> {
    fs: &'a dyn FileCache,
    xml_dir: PathBuf,
}

impl<'a> MarkupBundler<'a> {
    /// Creates a bundler resolving includes relative to `xml_dir`.
    pub fn new(fs: &'a dyn FileCache, xml_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            xml_dir: xml_dir.into(),
        }
    }

    /// Recursively expands every include in `xml`.
    ///
    /// Missing and circular includes are replaced by marker comments and
    /// logged. A fragment that exists but cannot be read is an error.
    pub fn bundle(&self, xml: &str) -> Result<String> {
        self.expand(xml, &mut ResolutionChain::new())
    }

    fn expand(&self, xml: &str, chain: &mut ResolutionChain) -> Result<String> {
        if xml.is_empty() {
            return Ok(String::new());
        }

        let mut result: Vec<String> = Vec::new();

        for line in xml.split('\n') {
            let Some(caps) = INCLUDE_PATTERN.captures(line) else {
                result.push(line.to_string());
                continue;
            };

            let indent = &caps[1];
            let target = clean_target(&caps[2]);

            if chain.contains(&target) {
                tracing::warn!("Circular XML include: {}", chain.describe_with(&target));
                result.push(format!("{}<!-- CIRCULAR: {} -->", indent, target));
                continue;
            }

            let path = self.xml_dir.join(target_file_name(&target));
            if !self.fs.exists(&path) || self.fs.is_dir(&path) {
                tracing::error!("Missing XML include: {}", path.display());
                result.push(format!("{}<!-- MISSING: {} -->", indent, target));
                continue;
            }

            let included = self.fs.read(&path)?;

            chain.enter(&target);
            let expanded = self.expand(&included, chain)?;
            chain.exit();

            let marker = format!("{}{}{} -->", indent, BUNDLE_MARKER, target);
            result.push(marker.clone());
            for inner in expanded.split('\n') {
                if inner.is_empty() {
                    result.push(String::new());
                } else {
                    result.push(format!("{}{}", indent, inner));
                }
            }
            result.push(marker);
        }

        Ok(result.join("\n"))
    }
}

/// A bundled document split back into its fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnbundledMarkup {
    /// The top-level document, with fragments reduced to include tags.
    pub root: String,
    /// Fragment name to content, in the order fragments were closed.
    pub fragments: IndexMap<String, String>,
}

struct Frame {
    name: String,
    indent: String,
    start: usize,
}

/// Splits a bundled document back into its root and fragments.
///
/// A marker matching the innermost open marker (same name, same indent)
/// closes it; any other marker opens a new fragment. Each closed range is
/// replaced by an include tag before scanning continues, so enclosing
/// fragments see a plain include rather than nested markers.
pub fn unbundle(xml: &str) -> UnbundledMarkup {
    let mut lines: Vec<String> = xml.split('\n').map(str::to_string).collect();
    let mut stack: Vec<Frame> = Vec::new();
    let mut fragments = IndexMap::new();

    let mut i = 0;
    while i < lines.len() {
        let (indent, name) = match MARKER_PATTERN.captures(&lines[i]) {
            Some(caps) => (caps[1].to_string(), caps[2].to_string()),
            None => {
                i += 1;
                continue;
            }
        };

        let closes = matches!(
            stack.last(),
            Some(top) if top.name == name && top.indent == indent
        );

        match stack.pop() {
            Some(frame) if closes => {
                let content = lines[frame.start + 1..i]
                    .iter()
                    .map(|line| line.strip_prefix(indent.as_str()).unwrap_or(line))
                    .collect::<Vec<_>>()
                    .join("\n");
                fragments.insert(name.clone(), content.trim().to_string());

                let tag = format!("{}<Include src=\"{}\"/>", indent, name);
                lines.splice(frame.start..=i, std::iter::once(tag));
                i = frame.start + 1;
            }
            popped => {
                stack.extend(popped);
                stack.push(Frame {
                    name,
                    indent,
                    start: i,
                });
                i += 1;
            }
        }
    }

    UnbundledMarkup {
        root: lines.join("\n").trim().to_string(),
        fragments,
    }
}

/// Unbundles `xml` into `out_dir`: the root to [`ROOT_FILE`], every fragment
/// to `UI/<name>.xml`. Returns the written paths relative to `out_dir`.
pub fn unbundle_to_files(xml: &str, out_dir: &Path, tx: &mut Transaction) -> Vec<String> {
    let unbundled = unbundle(xml);
    let mut files = Vec::with_capacity(unbundled.fragments.len() + 1);

    tx.write(out_dir.join(ROOT_FILE), unbundled.root);
    files.push(ROOT_FILE.to_string());

    for (name, content) in unbundled.fragments {
        let target = clean_target(&name);
        if target.is_empty() {
            tracing::warn!("Skipping XML fragment with unusable name: {}", name);
            continue;
        }
        let relative = format!("{}/{}", FRAGMENT_DIR, target_file_name(&target));
        tx.write(out_dir.join(&relative), content);
        files.push(relative);
    }

    files
}
