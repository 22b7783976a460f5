//! Manifest to tree: the `merge` direction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::flattener::{MARKUP_EXT, MEMO_EXT, STATE_EXT};
use crate::bundle::{ResolutionChain, ScriptBundler};
use crate::errors::{Result, TtsError};
use crate::io::{read_json, read_optional, FileCache};
use crate::model::{ManifestEntry, ManifestIndex, Node, ParentKey, Payload, GUID};

/// Script extensions tried next to an object's JSON file, in order.
const SCRIPT_EXTS: [&str; 2] = [".lua", ".ttslua"];

/// Resolves a `/`-separated manifest path against `src_dir`.
pub fn entry_path(src_dir: &Path, file: &str) -> PathBuf {
    file.split(['/', '\\'])
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .fold(src_dir.to_path_buf(), |acc, seg| acc.join(seg))
}

/// Checks that every entry's file exists, parses, and agrees with the
/// manifest on the GUID.
pub fn preflight(entries: &[ManifestEntry], fs: &dyn FileCache, src_dir: &Path) -> Result<()> {
    for entry in entries {
        let json: Value = read_json(fs, &entry_path(src_dir, &entry.file))?;

        let found = json.get(GUID).and_then(Value::as_str).filter(|s| !s.is_empty());
        if let (Some(manifest), Some(found)) = (entry.guid.as_deref().filter(|s| !s.is_empty()), found) {
            if manifest != found {
                return Err(TtsError::GuidMismatch {
                    file: entry.file.clone(),
                    manifest: manifest.to_string(),
                    found: found.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Rebuilds the object tree from a manifest index.
pub struct TreeBuilder<'a> {
    fs: &'a dyn FileCache,
    src_dir: PathBuf,
    scripts: &'a ScriptBundler<'a>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(fs: &'a dyn FileCache, src_dir: impl Into<PathBuf>, scripts: &'a ScriptBundler<'a>) -> Self {
        Self {
            fs,
            src_dir: src_dir.into(),
            scripts,
        }
    }

    /// Materializes the top-level objects, in sibling order.
    ///
    /// Groups whose parent GUID never appears in the tree cannot be placed;
    /// they are left out with a warning.
    pub fn build(&self, index: &ManifestIndex) -> Result<Vec<Node>> {
        let mut chain = ResolutionChain::new();
        let nodes = index
            .roots()
            .into_iter()
            .map(|entry| self.materialize(index, entry, &mut chain))
            .collect::<Result<Vec<_>>>()?;

        for (parent, files) in unreached_groups(index, &nodes) {
            tracing::warn!(
                "No object with GUID {} in the tree; skipping its {} child entr{}: {}",
                parent,
                files.len(),
                if files.len() == 1 { "y" } else { "ies" },
                files.join(", ")
            );
        }
        Ok(nodes)
    }

    fn materialize(
        &self,
        index: &ManifestIndex,
        entry: &ManifestEntry,
        chain: &mut ResolutionChain,
    ) -> Result<Node> {
        let json_path = entry_path(&self.src_dir, &entry.file);
        let value: Value = read_json(self.fs, &json_path)?;
        let mut node = Node::from_value(value)?;
        // Children come from the manifest only.
        node.children.clear();
        node.payload = self.load_payload(entry, &json_path, node.guid())?;

        let Some(guid) = node.guid().map(str::to_string) else {
            return Ok(node);
        };

        if chain.contains(&guid) {
            return Err(TtsError::Malformed(format!(
                "manifest nests object {} inside itself: {}",
                guid,
                chain.describe_with(&guid)
            )));
        }

        let children = index.children_of(&guid);
        if !children.is_empty() {
            chain.enter(&guid);
            node.children = children
                .into_iter()
                .map(|child| self.materialize(index, child, chain))
                .collect::<Result<Vec<_>>>()?;
            chain.exit();
        }

        Ok(node)
    }

    fn load_payload(&self, entry: &ManifestEntry, json_path: &Path, guid: Option<&str>) -> Result<Payload> {
        let stem = strip_json_ext(json_path);
        let sibling = |ext: &str| PathBuf::from(format!("{}{}", stem, ext));

        let mut script = None;
        for ext in SCRIPT_EXTS {
            if let Some(code) = read_optional(self.fs, &sibling(ext))? {
                let who = format!("object:{}", guid.unwrap_or("noguid"));
                script = Some(self.scripts.bundle(&code, &who)?);
                break;
            }
        }

        let payload = Payload {
            script,
            script_state: read_optional(self.fs, &sibling(STATE_EXT))?,
            markup: read_optional(self.fs, &sibling(MARKUP_EXT))?,
            memo: read_optional(self.fs, &sibling(MEMO_EXT))?,
        };

        if !payload.is_empty() {
            tracing::debug!("{}: attached payloads", entry.file);
        }
        Ok(payload)
    }
}

/// Returns the parent GUIDs of manifest groups that no built object claims,
/// each with the files it holds.
pub fn unreached_groups<'i>(index: &'i ManifestIndex, nodes: &[Node]) -> Vec<(&'i str, Vec<&'i str>)> {
    fn collect<'n>(nodes: &'n [Node], out: &mut HashSet<&'n str>) {
        for node in nodes {
            if let Some(guid) = node.guid() {
                out.insert(guid);
            }
            collect(&node.children, out);
        }
    }

    let mut reached = HashSet::new();
    collect(nodes, &mut reached);

    index
        .groups()
        .filter_map(|(key, entries)| match key {
            ParentKey::Object(guid) if !reached.contains(guid.as_str()) => Some((
                guid.as_str(),
                entries.iter().map(|e| e.file.as_str()).collect(),
            )),
            _ => None,
        })
        .collect()
}

fn strip_json_ext(path: &Path) -> String {
    let s = path.to_string_lossy();
    match s.len().checked_sub(5) {
        Some(cut) if s.is_char_boundary(cut) && s[cut..].eq_ignore_ascii_case(".json") => {
            s[..cut].to_string()
        }
        _ => s.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{to_pretty_json, Transaction, VirtualFS};
    use crate::model::CONTAINED_OBJECTS;
    use crate::test_utils::{entry, make_node, object_json};
    use crate::tree::flatten_nodes;
    use pretty_assertions::assert_eq;

    fn add_object(vfs: &mut VirtualFS, file: &str, guid: &str) {
        let json = to_pretty_json(&object_json(guid, "Card", guid)).unwrap();
        vfs.add_file(format!("src/{}", file), json);
    }

    fn guided(file: &str, guid: &str, parent: Option<&str>, order: Option<i64>) -> ManifestEntry {
        let mut e = entry(file, parent, order);
        e.guid = Some(guid.to_string());
        e
    }

    fn guids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().filter_map(Node::guid).collect()
    }

    #[test]
    fn test_build_orders_siblings() {
        let mut vfs = VirtualFS::new();
        for (file, guid) in [("a.json", "a"), ("b.json", "b"), ("c.json", "c"), ("k.json", "k")] {
            add_object(&mut vfs, file, guid);
        }
        let entries = vec![
            guided("b.json", "b", None, Some(1)),
            guided("k.json", "k", Some("a"), Some(0)),
            guided("a.json", "a", None, Some(0)),
            guided("c.json", "c", None, None),
        ];

        let scripts = ScriptBundler::new(&vfs, "lib");
        let builder = TreeBuilder::new(&vfs, "src", &scripts);
        let roots = builder.build(&ManifestIndex::new(&entries)).unwrap();

        assert_eq!(guids(&roots), vec!["a", "b", "c"]);
        assert_eq!(guids(&roots[0].children), vec!["k"]);
        assert!(roots[1].children.is_empty());
    }

    #[test]
    fn test_payloads_attached() {
        let mut vfs = VirtualFS::new();
        add_object(&mut vfs, "001_x.json", "x");
        vfs.add_file("src/001_x.ttslua", "print('hi')");
        vfs.add_file("src/001_x.state.txt", "{\"n\":1}");
        vfs.add_file("src/001_x.memo.txt", "note");

        let entries = vec![guided("001_x.json", "x", None, None)];
        let scripts = ScriptBundler::new(&vfs, "lib");
        let roots = TreeBuilder::new(&vfs, "src", &scripts)
            .build(&ManifestIndex::new(&entries))
            .unwrap();

        let payload = &roots[0].payload;
        assert_eq!(payload.script.as_deref(), Some("print('hi')"));
        assert_eq!(payload.script_state.as_deref(), Some("{\"n\":1}"));
        assert_eq!(payload.memo.as_deref(), Some("note"));
        assert_eq!(payload.markup, None);
    }

    #[test]
    fn test_file_children_are_ignored() {
        let mut vfs = VirtualFS::new();
        let mut json = object_json("p", "Bag", "Bag");
        json[CONTAINED_OBJECTS] = serde_json::json!([object_json("stale", "Card", "Old")]);
        vfs.add_file("src/p.json", json.to_string());

        let entries = vec![guided("p.json", "p", None, None)];
        let scripts = ScriptBundler::new(&vfs, "lib");
        let roots = TreeBuilder::new(&vfs, "src", &scripts)
            .build(&ManifestIndex::new(&entries))
            .unwrap();

        assert!(roots[0].children.is_empty());
        assert!(roots[0].clone().into_value().get(CONTAINED_OBJECTS).is_none());
    }

    #[test]
    fn test_orphaned_group_is_reported() {
        let mut vfs = VirtualFS::new();
        for (file, guid) in [("a.json", "a"), ("k.json", "k"), ("x.json", "x"), ("y.json", "y")] {
            add_object(&mut vfs, file, guid);
        }
        let entries = vec![
            guided("a.json", "a", None, Some(0)),
            guided("k.json", "k", Some("a"), Some(0)),
            guided("x.json", "x", Some("typo"), Some(0)),
            guided("y.json", "y", Some("typo"), Some(1)),
        ];
        let index = ManifestIndex::new(&entries);

        let scripts = ScriptBundler::new(&vfs, "lib");
        let roots = TreeBuilder::new(&vfs, "src", &scripts).build(&index).unwrap();

        assert_eq!(guids(&roots), vec!["a"]);
        assert_eq!(guids(&roots[0].children), vec!["k"]);
        assert_eq!(
            unreached_groups(&index, &roots),
            vec![("typo", vec!["x.json", "y.json"])]
        );
    }

    #[test]
    fn test_self_nesting_is_an_error() {
        let mut vfs = VirtualFS::new();
        add_object(&mut vfs, "a.json", "a");
        add_object(&mut vfs, "a2.json", "a");
        let entries = vec![guided("a.json", "a", None, None), guided("a2.json", "a", Some("a"), None)];

        let scripts = ScriptBundler::new(&vfs, "lib");
        let result = TreeBuilder::new(&vfs, "src", &scripts).build(&ManifestIndex::new(&entries));
        assert!(matches!(result, Err(TtsError::Malformed(_))));
    }

    #[test]
    fn test_preflight() {
        let mut vfs = VirtualFS::new();
        add_object(&mut vfs, "a.json", "a");
        vfs.add_file("src/bad.json", "{ not json");

        assert!(preflight(&[guided("a.json", "a", None, None)], &vfs, Path::new("src")).is_ok());

        let mismatch = preflight(&[guided("a.json", "zzz", None, None)], &vfs, Path::new("src"));
        assert!(matches!(mismatch, Err(TtsError::GuidMismatch { .. })));

        let missing = preflight(&[entry("gone.json", None, None)], &vfs, Path::new("src"));
        assert!(matches!(missing, Err(TtsError::MissingFile { .. })));

        let invalid = preflight(&[entry("bad.json", None, None)], &vfs, Path::new("src"));
        assert!(matches!(invalid, Err(TtsError::InvalidJson { .. })));
    }

    #[test]
    fn test_flatten_then_build_round_trip() {
        let mut deck = make_node("d1", "Deck", "Spells");
        let mut bolt = make_node("c1", "Card", "Bolt");
        bolt.payload.script = Some("print('bolt')".to_string());
        bolt.payload.markup = Some("<Text>Bolt</Text>".to_string());
        let mut nested = make_node("c2", "Bag", "Pouch");
        nested.children = vec![make_node("g1", "Chip", "Gem")];
        deck.children = vec![bolt, nested];
        deck.payload.script_state = Some("{\"open\":true}".to_string());
        let tree = vec![deck, make_node("t1", "Table", "Board")];

        let mut tx = Transaction::new();
        let manifest = flatten_nodes(&tree, Path::new("src"), &mut tx).unwrap();

        let mut vfs = VirtualFS::new();
        vfs.load_writes(&tx);

        preflight(&manifest, &vfs, Path::new("src")).unwrap();
        let scripts = ScriptBundler::new(&vfs, "lib");
        let rebuilt = TreeBuilder::new(&vfs, "src", &scripts)
            .build(&ManifestIndex::new(&manifest))
            .unwrap();

        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_strip_json_ext() {
        assert_eq!(strip_json_ext(Path::new("src/a.json")), "src/a");
        assert_eq!(strip_json_ext(Path::new("src/a.JSON")), "src/a");
        assert_eq!(strip_json_ext(Path::new("src/a")), "src/a");
    }
}
