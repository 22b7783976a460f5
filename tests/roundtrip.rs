//! Split -> merge -> split through the public API.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::tempdir;
use ttsave::commands::{merge, split, MergeOptions, SplitOptions};
use ttsave::Context;

fn save() -> Value {
    json!({
        "SaveName": "Arena",
        "GameMode": "Arena",
        "Date": "1/1/2024",
        "ObjectStates": [
            {
                "GUID": "d1",
                "Name": "Deck",
                "Nickname": "Spells",
                "Transform": {"posX": 1.5, "posY": 1.0, "posZ": -2.0},
                "LuaScript": "function onLoad()\n  print('deck')\nend",
                "LuaScriptState": "{\"count\":3}",
                "ContainedObjects": [
                    {
                        "GUID": "c1",
                        "Name": "Card",
                        "Nickname": "Bolt",
                        "Transform": {"posX": 0.0, "posY": 0.0, "posZ": 0.0},
                        "Memo": "deals 3"
                    },
                    {
                        "GUID": "c2",
                        "Name": "Bag",
                        "Nickname": "Pouch",
                        "Transform": {"posX": 0.0, "posY": 0.0, "posZ": 0.0},
                        "ContainedObjects": [
                            {"GUID": "g1", "Name": "Chip", "Nickname": "Gem", "Transform": {"posX": 0.0}}
                        ]
                    }
                ]
            },
            {
                "GUID": "t1",
                "Name": "Custom_Tile",
                "Nickname": "Board",
                "Transform": {"posX": 0.0, "posY": 0.0, "posZ": 0.0},
                "XmlUI": "<Text>Board</Text>"
            }
        ],
        "LuaScript": "local util = require(\"util\")\nprint(util.name)",
        "LuaScriptState": "",
        "XmlUI": "<Panel>\n  <!-- include menu -->\n  <Button/>\n  <!-- include menu -->\n</Panel>"
    })
}

/// Reads every file below `root`, keyed by `/`-separated relative path.
fn read_tree(root: &Path) -> BTreeMap<String, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.insert(key, fs::read_to_string(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn setup() -> (tempfile::TempDir, Context) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("Save.json"), save().to_string()).unwrap();
    fs::create_dir_all(dir.path().join("lib")).unwrap();
    fs::write(
        dir.path().join("lib/util.lua"),
        "return { name = 'util' }",
    )
    .unwrap();
    let ctx = Context::default_for_dir(dir.path().to_path_buf());
    (dir, ctx)
}

fn merge_dev(ctx: &Context) -> PathBuf {
    merge(
        ctx,
        MergeOptions {
            version: "vDEV".to_string(),
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn test_split_merge_split_is_stable() {
    let (dir, ctx) = setup();

    split(&ctx, SplitOptions::default()).unwrap();

    let output = merge_dev(&ctx);
    assert_eq!(output, dir.path().join("build/Arena_vDEV.json"));

    split(
        &ctx,
        SplitOptions {
            input: Some(output),
            out_dir: Some(PathBuf::from("src2")),
            dry_run: false,
        },
    )
    .unwrap();
    let mut first = read_tree(&dir.path().join("src"));
    let mut second = read_tree(&dir.path().join("src2"));

    // Merge stamps the version; everything else survives unchanged.
    let base_of = |tree: &mut BTreeMap<String, String>| -> Value {
        serde_json::from_str(&tree.remove("base.json").unwrap()).unwrap()
    };
    let mut expected_base = base_of(&mut first);
    expected_base["VersionNumber"] = json!("vDEV");
    assert_eq!(base_of(&mut second), expected_base);

    assert_eq!(first, second);
    assert!(first.contains_key("manifest.json"));
    assert!(first.contains_key("Global/UI/menu.xml"));
    assert_eq!(
        first.get("Global/Global.lua").map(String::as_str),
        Some("local util = require(\"util\")\nprint(util.name)")
    );
    assert!(first.contains_key("Contained/Spells_d1/Contained/Pouch_c2/001_Chip_g1.json"));
}

#[test]
fn test_merged_document_matches_original() {
    let (dir, ctx) = setup();

    split(&ctx, SplitOptions::default()).unwrap();
    let output = merge_dev(&ctx);
    let merged: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let original = save();

    assert_eq!(merged["ObjectStates"], original["ObjectStates"]);
    assert_eq!(merged["XmlUI"], original["XmlUI"]);
    assert_eq!(merged["Date"], "1/1/2024");
    assert_eq!(merged["VersionNumber"], "vDEV");

    let script = merged["LuaScript"].as_str().unwrap();
    assert!(script.contains("__bundle_register(\"util\""));
    assert!(script.contains("return { name = 'util' }"));
    assert!(script.ends_with("return __bundle_require(\"__root\")"));

    // Dev builds never archive.
    assert!(!dir.path().join("archive").exists());
}

#[test]
fn test_dev_rebuild_overwrites() {
    let (dir, ctx) = setup();

    split(&ctx, SplitOptions::default()).unwrap();
    let first = merge_dev(&ctx);
    fs::write(
        dir.path().join("src/002_Board.Custom_Tile_t1.xml"),
        "<Text>Changed</Text>",
    )
    .unwrap();
    let second = merge_dev(&ctx);

    assert_eq!(first, second);
    let merged: Value = serde_json::from_str(&fs::read_to_string(&second).unwrap()).unwrap();
    assert_eq!(merged["ObjectStates"][1]["XmlUI"], "<Text>Changed</Text>");
}
