//! Watch command implementation.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use glob::Pattern;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::merge::{merge, MergeOptions};
use crate::errors::{Result, TtsError};
use crate::interface::Context;

/// Options for the watch command.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Debounce delay in milliseconds; 0 uses the configured value.
    pub debounce_ms: u64,
    /// Extra merge diagnostics.
    pub debug: bool,
}

/// At-most-one-rebuild bookkeeping.
///
/// A request while a rebuild is running does not start a second one; it
/// marks exactly one follow-up, however many requests arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildQueue {
    running: bool,
    pending: bool,
}

impl RebuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a rebuild. Returns true if the caller should start it now.
    pub fn request(&mut self) -> bool {
        if self.running {
            self.pending = true;
            false
        } else {
            self.running = true;
            true
        }
    }

    /// Marks the running rebuild as finished. Returns true if a follow-up
    /// should start now; the queue then stays in the running state.
    pub fn finish(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.running = false;
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Decides which file events trigger a rebuild.
#[derive(Debug, Clone)]
pub struct EventFilter {
    base_dir: PathBuf,
    exclude: Vec<Pattern>,
    ignored_dirs: Vec<PathBuf>,
}

impl EventFilter {
    /// Compiles the exclude globs. Events under `ignored_dirs` (the build
    /// output) never count.
    pub fn new(base_dir: PathBuf, exclude: &[String], ignored_dirs: Vec<PathBuf>) -> Result<Self> {
        let exclude = exclude
            .iter()
            .map(|p| {
                Pattern::new(p)
                    .map_err(|e| TtsError::Config(format!("invalid watch exclude {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            base_dir,
            exclude,
            ignored_dirs,
        })
    }

    /// Returns true if `path` should trigger a rebuild.
    pub fn is_relevant_path(&self, path: &Path) -> bool {
        if self.ignored_dirs.iter().any(|dir| path.starts_with(dir)) {
            return false;
        }
        let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
        !self.exclude.iter().any(|p| p.matches_path(relative))
    }

    /// Returns true if `event` should trigger a rebuild.
    pub fn is_relevant(&self, event: &Event) -> bool {
        !matches!(event.kind, EventKind::Access(_))
            && event.paths.iter().any(|p| self.is_relevant_path(p))
    }
}

/// Watches the source and library directories and rebuilds on change.
///
/// Each rebuild is an in-process merge with the dev version tag. Failures
/// are logged and watching continues.
pub fn watch(ctx: &Context, options: WatchOptions) -> Result<()> {
    let debounce = Duration::from_millis(if options.debounce_ms > 0 {
        options.debounce_ms
    } else {
        ctx.config.watch.debounce_ms
    });

    let filter = EventFilter::new(
        ctx.base_dir.clone(),
        &ctx.config.watch.exclude,
        vec![ctx.build_dir(), ctx.archive_dir()],
    )?;
    let merge_options = MergeOptions {
        version: ctx.config.dev_version.clone(),
        debug: options.debug,
        ..Default::default()
    };

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        Config::default().with_poll_interval(debounce),
    )
    .map_err(|e| TtsError::Watch(e.to_string()))?;

    let src_dir = ctx.src_dir();
    watcher
        .watch(&src_dir, RecursiveMode::Recursive)
        .map_err(|e| TtsError::Watch(format!("{}: {}", src_dir.display(), e)))?;

    let lib_dir = ctx.lib_dir();
    if lib_dir.is_dir() {
        watcher
            .watch(&lib_dir, RecursiveMode::Recursive)
            .map_err(|e| TtsError::Watch(format!("{}: {}", lib_dir.display(), e)))?;
    }

    tracing::info!(
        "Watching {} (version={}, debounce: {}ms)...",
        src_dir.display(),
        merge_options.version,
        debounce.as_millis()
    );
    tracing::info!("Press Ctrl+C to stop.");

    let mut queue = RebuildQueue::new();
    loop {
        let event = rx
            .recv()
            .map_err(|e| TtsError::Watch(format!("event channel closed: {}", e)))?;
        if !filter.is_relevant(&event) || !queue.request() {
            continue;
        }
        tracing::debug!("Changed: {:?}", event.paths);

        loop {
            settle(&rx, debounce);
            rebuild(ctx, &merge_options);

            if rx.try_iter().any(|event| filter.is_relevant(&event)) {
                queue.request();
            }
            if !queue.finish() {
                break;
            }
        }
    }
}

/// Swallows the rest of a burst: waits until no event arrived for `quiet`.
fn settle(rx: &Receiver<Event>, quiet: Duration) {
    let mut deadline = Instant::now() + quiet;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(_) => deadline = Instant::now() + quiet,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn rebuild(ctx: &Context, options: &MergeOptions) {
    tracing::info!("Change detected, rebuilding (version={})...", options.version);
    match merge(ctx, options.clone()) {
        Ok(output) => tracing::info!("Rebuild complete: {}", output.display()),
        Err(e) => tracing::error!("Rebuild failed: {}", e),
    }
}
