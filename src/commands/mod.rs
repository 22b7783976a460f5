//! Command implementations: split, merge and watch.

mod helpers;
mod merge;
mod split;
mod watch;

pub use helpers::run_transaction;
pub use merge::{
    clean_version, is_dev_version, merge, output_file_name, pick_base_name, plan_archive,
    plan_merge, MergeOptions, MergePlan, DEFAULT_BASE_NAME,
};
pub use split::{plan_split, split, SplitOptions, SplitPlan, BASE_FILE, GLOBAL_DIR, MANIFEST_FILE};
pub use watch::{watch, EventFilter, RebuildQueue, WatchOptions};
