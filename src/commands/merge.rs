//! Merge command implementation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::helpers::run_transaction;
use super::split::{
    BASE_FILE, GLOBAL_DIR, GLOBAL_SCRIPT, GLOBAL_SCRIPT_ALT, GLOBAL_STATE, MANIFEST_FILE,
};
use crate::bundle::{xml, MarkupBundler, ScriptBundler};
use crate::errors::{Result, TtsError};
use crate::interface::Context;
use crate::io::{read_json, read_optional, to_pretty_json, FileCache, Transaction};
use crate::model::{
    non_blank_str, ManifestEntry, ManifestIndex, Payload, SaveDocument, GAME_MODE, SAVE_NAME,
    VERSION_NUMBER,
};
use crate::names::sanitize_name;
use crate::tree::{preflight, TreeBuilder};
use crate::validate::validate_document;

/// Fallback base name for the output file.
pub const DEFAULT_BASE_NAME: &str = "TTS_Save";

static DEV_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^v?dev$").unwrap());

static VERSION_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Options for the merge command.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Version tag, e.g. `v1.2.0`. Required.
    pub version: String,
    /// Output directory; defaults to the configured build directory.
    pub out_dir: Option<PathBuf>,
    /// Show what would be written without touching the disk.
    pub dry_run: bool,
    /// Extra diagnostics (manifest groups, bundling details).
    pub debug: bool,
}

/// Result of planning a merge.
#[derive(Debug)]
pub struct MergePlan {
    /// Path of the merged save file.
    pub output: PathBuf,
    /// The assembled document.
    pub document: Value,
    /// Number of objects, including contained ones.
    pub object_count: usize,
    /// Archive moves followed by the output write.
    pub transaction: Transaction,
}

/// Assembles and validates the save file without writing anything.
pub fn plan_merge(ctx: &Context, options: &MergeOptions) -> Result<MergePlan> {
    if options.version.trim().is_empty() {
        return Err(TtsError::MissingVersion);
    }

    let fs = ctx.file_cache.as_ref();
    let debug = options.debug || ctx.config.debug;
    let src_dir = ctx.src_dir();

    let manifest_path = src_dir.join(MANIFEST_FILE);
    if !fs.exists(&manifest_path) {
        return Err(TtsError::Config(format!(
            "{} not found in {}",
            MANIFEST_FILE,
            src_dir.display()
        )));
    }

    let entries: Vec<ManifestEntry> = read_json(fs, &manifest_path)?;
    let base: Map<String, Value> = read_json(fs, &src_dir.join(BASE_FILE))?;

    preflight(&entries, fs, &src_dir)?;

    let index = ManifestIndex::new(&entries);
    if debug {
        log_groups(&index);
    }

    let lib_dir = ctx.lib_dir();
    let scripts = ScriptBundler::new(fs, &lib_dir).with_debug(debug);
    let objects = TreeBuilder::new(fs, &src_dir, &scripts).build(&index)?;
    let object_count = objects.iter().map(|n| n.count()).sum();

    let roots = index.roots();
    let base_name = pick_base_name(&base, roots.first().copied());
    let file_name = output_file_name(&base_name, &options.version);
    let out_dir = match &options.out_dir {
        Some(dir) => ctx.resolve_path(dir),
        None => ctx.build_dir(),
    };
    let output = out_dir.join(&file_name);

    let global = load_global(fs, &src_dir.join(GLOBAL_DIR), &scripts, debug)?;

    let mut doc = SaveDocument {
        base,
        objects,
        global,
    };
    for key in [SAVE_NAME, GAME_MODE] {
        if doc.base_str(key).is_none() {
            doc.base
                .insert(key.to_string(), Value::String(base_name.clone()));
        }
    }
    doc.base.insert(
        VERSION_NUMBER.to_string(),
        Value::String(options.version.clone()),
    );
    let game_mode = doc.base_str(GAME_MODE).unwrap_or(&base_name).to_string();

    let document = doc.into_value();
    validate_document(&document).into_result()?;

    let mut tx = Transaction::new();
    if is_dev_version(&options.version) {
        tracing::info!("Dev build: archiving disabled, {} will be overwritten", file_name);
    } else if ctx.env.is_ci() {
        tracing::info!("CI detected: archiving disabled");
    } else {
        plan_archive(
            fs,
            &out_dir,
            &ctx.archive_dir(),
            &game_mode,
            Utc::now(),
            &mut tx,
        )?;
    }
    tx.write(&output, to_pretty_json(&document)?);

    Ok(MergePlan {
        output,
        document,
        object_count,
        transaction: tx,
    })
}

/// Merges the source layout into a single save file and returns its path.
pub fn merge(ctx: &Context, options: MergeOptions) -> Result<PathBuf> {
    let plan = plan_merge(ctx, &options)?;
    run_transaction(&plan.transaction, options.dry_run, "merge")?;

    if !options.dry_run {
        tracing::info!(
            "Merged {} objects into {}",
            plan.object_count,
            plan.output.display()
        );
        if let Some(game_mode) = plan.document.get(GAME_MODE).and_then(Value::as_str) {
            tracing::info!("GameMode: {}", game_mode);
        }
    }
    Ok(plan.output)
}

/// Picks the output base name: `SaveName`, `GameMode`, the first top-level
/// object's nickname or type, then [`DEFAULT_BASE_NAME`].
pub fn pick_base_name(base: &Map<String, Value>, first_root: Option<&ManifestEntry>) -> String {
    let primary = non_blank_str(base, SAVE_NAME)
        .or_else(|| non_blank_str(base, GAME_MODE))
        .or_else(|| {
            first_root.map(|entry| {
                entry
                    .nickname
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(entry.kind.as_str())
            })
        })
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BASE_NAME);

    sanitize_name(primary, DEFAULT_BASE_NAME)
}

/// Normalizes a version tag for use in a file name.
///
/// Leading `v`/`V` characters are dropped: `v1.2.0` becomes `1.2.0`.
pub fn clean_version(version: &str) -> String {
    let tag = version.trim().trim_start_matches(['v', 'V']);
    VERSION_UNSAFE
        .replace_all(&sanitize_name(tag, "dev"), "_")
        .into_owned()
}

/// Returns `<base>_v<version>.json`.
pub fn output_file_name(base_name: &str, version: &str) -> String {
    format!("{}_v{}.json", base_name, clean_version(version))
}

/// Returns true for development tags (`dev`, `vDEV`, ...), which skip archiving.
pub fn is_dev_version(version: &str) -> bool {
    DEV_VERSION.is_match(version.trim())
}

/// Schedules a move to `archive_dir` for every build whose `GameMode`
/// equals `game_mode`.
pub fn plan_archive(
    cache: &dyn FileCache,
    build_dir: &Path,
    archive_dir: &Path,
    game_mode: &str,
    now: DateTime<Utc>,
    tx: &mut Transaction,
) -> Result<()> {
    if !build_dir.is_dir() {
        return Ok(());
    }

    let mut builds: Vec<PathBuf> = std::fs::read_dir(build_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    builds.sort();

    let stamp = now.format("%Y-%m-%dT%H-%M-%S");
    for path in builds {
        let content: Value = read_json(cache, &path)?;
        if content.get(GAME_MODE).and_then(Value::as_str) != Some(game_mode) {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = archive_dir.join(format!("{}_{}.json", stem, stamp));
        tracing::info!("Archiving {} -> {}", path.display(), target.display());
        tx.move_file(path, target);
    }
    Ok(())
}

/// Loads `Global/`: the script (bundled), its state and the UI markup.
fn load_global(
    fs: &dyn FileCache,
    global_dir: &Path,
    scripts: &ScriptBundler<'_>,
    debug: bool,
) -> Result<Payload> {
    let mut script = None;
    for name in [GLOBAL_SCRIPT, GLOBAL_SCRIPT_ALT] {
        if let Some(code) = read_optional(fs, &global_dir.join(name))? {
            script = Some(scripts.bundle(&code, "Global")?);
            break;
        }
    }

    let markup = match read_optional(fs, &global_dir.join(xml::ROOT_FILE))? {
        Some(raw) if xml::has_includes(&raw) => {
            let fragments = global_dir.join(xml::FRAGMENT_DIR);
            let xml_dir = if fs.is_dir(&fragments) {
                fragments
            } else {
                global_dir.to_path_buf()
            };
            match MarkupBundler::new(fs, &xml_dir).bundle(&raw) {
                Ok(bundled) => {
                    if debug {
                        tracing::info!("UI bundled with includes from {}", xml_dir.display());
                    }
                    Some(bundled)
                }
                Err(e) => {
                    tracing::error!("Error bundling UI, using it unbundled: {}", e);
                    Some(raw)
                }
            }
        }
        other => other,
    };

    Ok(Payload {
        script,
        script_state: read_optional(fs, &global_dir.join(GLOBAL_STATE))?,
        markup,
        memo: None,
    })
}

fn log_groups(index: &ManifestIndex) {
    tracing::info!("Manifest groups: {}", index.len());
    for (key, group) in index.groups() {
        let orders: Vec<String> = group
            .iter()
            .map(|e| e.order.map_or_else(|| "null".to_string(), |o| o.to_string()))
            .collect();
        tracing::info!(
            "  - {}: {} item(s) | order: [{}]",
            key,
            group.len(),
            orders.join(", ")
        );
    }
}
