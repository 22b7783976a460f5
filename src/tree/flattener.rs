//! Tree to manifest: the `split` direction.

use std::path::Path;

use serde_json::Value;

use crate::bundle::extract_root_module;
use crate::errors::Result;
use crate::io::{to_pretty_json, Transaction};
use crate::model::{ManifestEntry, Node, Payload};
use crate::names::{pad_index, path_segment};

/// Directory, next to a parent's file, holding its children.
pub const CONTAINED_DIR: &str = "Contained";

/// Sibling file extensions for the object payloads.
pub const SCRIPT_EXT: &str = ".lua";
pub const STATE_EXT: &str = ".state.txt";
pub const MARKUP_EXT: &str = ".xml";
pub const MEMO_EXT: &str = ".memo.txt";

/// Flattens `nodes` into per-object files under `out_dir`.
///
/// Every write is recorded into `tx`. Returns the manifest entries in
/// depth-first pre-order; `file` paths are relative to `out_dir` and
/// `/`-separated.
pub fn flatten_nodes(
    nodes: &[Node],
    out_dir: &Path,
    tx: &mut Transaction,
) -> Result<Vec<ManifestEntry>> {
    let mut flattener = Flattener {
        out_dir,
        tx,
        entries: Vec::new(),
    };
    flattener.walk(nodes, "", None)?;
    Ok(flattener.entries)
}

struct Flattener<'a> {
    out_dir: &'a Path,
    tx: &'a mut Transaction,
    entries: Vec<ManifestEntry>,
}

impl Flattener<'_> {
    fn walk(&mut self, nodes: &[Node], rel_dir: &str, parent: Option<&str>) -> Result<()> {
        for (index, node) in nodes.iter().enumerate() {
            let stem = file_stem(node, index, parent.is_none());
            let rel_stem = join_rel(rel_dir, &stem);
            let rel_file = format!("{}.json", rel_stem);

            self.write_payloads(&node.payload, &rel_stem);
            self.tx.write(
                self.out_dir.join(&rel_file),
                to_pretty_json(&Value::Object(node.fields.clone()))?,
            );

            self.entries.push(ManifestEntry {
                kind: node.name().unwrap_or("Object").to_string(),
                nickname: node.nickname().map(str::to_string),
                guid: node.guid().map(str::to_string),
                file: rel_file,
                parent: parent.map(str::to_string),
                order: Some(index as f64),
            });

            if node.children.is_empty() {
                continue;
            }

            if node.guid().is_none() {
                tracing::warn!(
                    "{} has contained objects but no GUID; they will merge as top-level objects",
                    rel_stem
                );
            }

            let container = format!(
                "{}/{}_{}",
                CONTAINED_DIR,
                path_segment(node.nickname()),
                path_segment(Some(node.guid().unwrap_or("noguid")))
            );
            self.walk(&node.children, &join_rel(rel_dir, &container), node.guid())?;
        }
        Ok(())
    }

    fn write_payloads(&mut self, payload: &Payload, rel_stem: &str) {
        let pairs = [
            (SCRIPT_EXT, payload.script.as_deref().map(extract_root_module)),
            (STATE_EXT, payload.script_state.clone()),
            (MARKUP_EXT, payload.markup.clone()),
            (MEMO_EXT, payload.memo.clone()),
        ];

        for (ext, text) in pairs {
            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                self.tx
                    .write(self.out_dir.join(format!("{}{}", rel_stem, ext)), text);
            }
        }
    }
}

/// Returns `NNN_<base>_<guid>` for a node at sibling position `index`.
///
/// Only top-level nodes put their nickname into the base.
pub fn file_stem(node: &Node, index: usize, top_level: bool) -> String {
    let guid = path_segment(Some(node.guid().unwrap_or("noguid")));
    let base = match (node.nickname(), node.name()) {
        (Some(nickname), Some(name)) if top_level => {
            path_segment(Some(&format!("{}.{}", nickname, name)))
        }
        (_, Some(name)) => path_segment(Some(name)),
        _ => "Unnamed".to_string(),
    };
    format!("{}_{}_{}", pad_index(index), base, guid)
}

fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
