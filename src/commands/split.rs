//! Split command implementation.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::helpers::run_transaction;
use crate::bundle::{extract_root_module, unbundle_to_files, xml};
use crate::errors::{Result, TtsError};
use crate::interface::Context;
use crate::io::{read_json, to_pretty_json, Transaction};
use crate::model::{Payload, SaveDocument};
use crate::tree::flatten_nodes;

/// Directory holding the document-level payloads.
pub const GLOBAL_DIR: &str = "Global";
pub const GLOBAL_SCRIPT: &str = "Global.lua";
pub const GLOBAL_SCRIPT_ALT: &str = "Global.ttslua";
pub const GLOBAL_STATE: &str = "Global.state.txt";
pub const BASE_FILE: &str = "base.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Options for the split command.
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    /// Save file to split; defaults to the configured input.
    pub input: Option<PathBuf>,
    /// Output directory; defaults to the configured source directory.
    pub out_dir: Option<PathBuf>,
    /// Show what would be written without touching the disk.
    pub dry_run: bool,
}

/// Result of planning a split.
#[derive(Debug)]
pub struct SplitPlan {
    /// Output directory.
    pub out_dir: PathBuf,
    /// Number of objects, including contained ones.
    pub object_count: usize,
    /// All writes, starting with the clean of `out_dir`.
    pub transaction: Transaction,
}

/// Reads and decomposes the save file without writing anything.
pub fn plan_split(ctx: &Context, options: &SplitOptions) -> Result<SplitPlan> {
    let input = ctx.resolve_path(options.input.as_deref().unwrap_or(ctx.config.input.as_path()));
    if !ctx.file_cache.exists(&input) {
        return Err(TtsError::Config(format!(
            "Save file not found: {}",
            input.display()
        )));
    }

    let value: Value = read_json(ctx.file_cache.as_ref(), &input)?;
    let doc = SaveDocument::from_value(value)?;

    let out_dir = match &options.out_dir {
        Some(dir) => ctx.resolve_path(dir),
        None => ctx.src_dir(),
    };

    let mut tx = Transaction::new();
    tx.clean_dir(&out_dir);

    let entries = flatten_nodes(&doc.objects, &out_dir, &mut tx)?;
    let object_count = doc.objects.iter().map(|n| n.count()).sum();

    write_global(&doc.global, &out_dir.join(GLOBAL_DIR), &mut tx);

    tx.write(out_dir.join(BASE_FILE), to_pretty_json(&doc.base)?);
    tx.write(out_dir.join(MANIFEST_FILE), to_pretty_json(&entries)?);

    Ok(SplitPlan {
        out_dir,
        object_count,
        transaction: tx,
    })
}

/// Splits a save file into the source layout.
pub fn split(ctx: &Context, options: SplitOptions) -> Result<()> {
    let plan = plan_split(ctx, &options)?;
    run_transaction(&plan.transaction, options.dry_run, "split")?;

    if !options.dry_run {
        tracing::info!(
            "Split {} objects into {}",
            plan.object_count,
            plan.out_dir.display()
        );
    }
    Ok(())
}

fn write_global(global: &Payload, global_dir: &Path, tx: &mut Transaction) {
    if let Some(script) = non_blank(&global.script) {
        tx.write(global_dir.join(GLOBAL_SCRIPT), extract_root_module(script));
    }

    if let Some(state) = non_blank(&global.script_state) {
        tx.write(global_dir.join(GLOBAL_STATE), state);
    }

    if let Some(markup) = non_blank(&global.markup) {
        if xml::is_bundled(markup) {
            let files = unbundle_to_files(markup, global_dir, tx);
            tracing::info!("Global UI unbundled into {} file(s)", files.len());
        } else {
            tx.write(global_dir.join(xml::ROOT_FILE), markup);
        }
    }
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ManifestEntry;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn save() -> Value {
        json!({
            "SaveName": "Arena",
            "GameMode": "Arena",
            "ObjectStates": [
                {
                    "GUID": "d1", "Name": "Deck", "Nickname": "Spells",
                    "Transform": {"posX": 1.0},
                    "LuaScript": "print('deck')",
                    "ContainedObjects": [
                        {"GUID": "c1", "Name": "Card", "Nickname": "Bolt", "Transform": {}}
                    ]
                }
            ],
            "LuaScript": "print('global')",
            "LuaScriptState": "",
            "XmlUI": "<Panel>\n  <!-- include menu -->\n  <Button/>\n  <!-- include menu -->\n</Panel>"
        })
    }

    fn context(dir: &Path) -> Context {
        fs::write(dir.join("Save.json"), save().to_string()).unwrap();
        Context::default_for_dir(dir.to_path_buf())
    }

    #[test]
    fn test_split_layout() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        fs::create_dir_all(dir.path().join("src/stale")).unwrap();

        split(&ctx, SplitOptions::default()).unwrap();

        let src = dir.path().join("src");
        assert!(!src.join("stale").exists());
        assert!(src.join("001_Spells.Deck_d1.json").is_file());
        assert!(src.join("Contained/Spells_d1/001_Card_c1.json").is_file());
        assert_eq!(
            fs::read_to_string(src.join("001_Spells.Deck_d1.lua")).unwrap(),
            "print('deck')"
        );
        assert_eq!(
            fs::read_to_string(src.join("Global/Global.lua")).unwrap(),
            "print('global')"
        );
        assert!(!src.join("Global/Global.state.txt").exists());
        assert_eq!(
            fs::read_to_string(src.join("Global/UI.xml")).unwrap(),
            "<Panel>\n  <Include src=\"menu\"/>\n</Panel>"
        );
        assert_eq!(
            fs::read_to_string(src.join("Global/UI/menu.xml")).unwrap(),
            "<Button/>"
        );

        let base: Value =
            serde_json::from_str(&fs::read_to_string(src.join("base.json")).unwrap()).unwrap();
        assert_eq!(base, json!({"SaveName": "Arena", "GameMode": "Arena"}));

        let manifest: Vec<ManifestEntry> =
            serde_json::from_str(&fs::read_to_string(src.join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest[1].parent.as_deref(), Some("d1"));
    }

    #[test]
    fn test_manifest_nulls() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let plan = plan_split(&ctx, &SplitOptions::default()).unwrap();

        let manifest = plan
            .transaction
            .content_of(&dir.path().join("src/manifest.json"))
            .unwrap();
        let value: Value = serde_json::from_str(manifest).unwrap();
        assert_eq!(value[0]["parent"], Value::Null);
        assert_eq!(value[0]["type"], "Deck");
        assert_eq!(value[1]["order"], 0);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        split(
            &ctx,
            SplitOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!dir.path().join("src").exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let ctx = Context::default_for_dir(dir.path().to_path_buf());
        assert!(matches!(
            split(&ctx, SplitOptions::default()),
            Err(TtsError::Config(_))
        ));
    }

    #[test]
    fn test_no_object_states() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Save.json"), "{\"SaveName\": \"x\"}").unwrap();
        let ctx = Context::default_for_dir(dir.path().to_path_buf());

        assert!(matches!(
            split(&ctx, SplitOptions::default()),
            Err(TtsError::Malformed(_))
        ));
        assert!(!dir.path().join("src").exists());
    }
}
