//! File system watcher for dev mode.
//!
//! Monitors the content, template and asset directories plus the config
//! file, and re-runs the full build on change. There is no incremental
//! path: every rebuild recompiles all content from scratch.
//!
//! Rebuild requests coalesce: change events that arrive while a rebuild is
//! running collapse into exactly one follow-up rebuild, never a queue of N.
//! The [`RebuildScheduler`] owns that policy; `build_site` itself stays
//! stateless and repeatedly callable.

use crate::{build::build_site, config::SitePaths, log};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::Receiver,
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Rebuild Scheduler
// =============================================================================

/// Two-state rebuild scheduler: `Idle`, or `Running` with an optional
/// coalesced follow-up request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildScheduler {
    Idle,
    Running { pending: bool },
}

impl RebuildScheduler {
    pub fn new() -> Self {
        RebuildScheduler::Idle
    }

    /// A rebuild was requested. Returns true when the caller should run a
    /// build now; otherwise the request folds into the running build's
    /// single pending slot.
    pub fn request(&mut self) -> bool {
        match self {
            RebuildScheduler::Idle => {
                *self = RebuildScheduler::Running { pending: false };
                true
            }
            RebuildScheduler::Running { pending } => {
                *pending = true;
                false
            }
        }
    }

    /// The running build finished. Returns true when a coalesced request
    /// arrived meanwhile and the caller owes exactly one more build.
    pub fn completed(&mut self) -> bool {
        match self {
            RebuildScheduler::Running { pending: true } => {
                *self = RebuildScheduler::Running { pending: false };
                true
            }
            _ => {
                *self = RebuildScheduler::Idle;
                false
            }
        }
    }
}

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

fn setup_watchers(watcher: &mut impl Watcher, paths: &SitePaths) -> Result<()> {
    let targets: [(&Path, RecursiveMode); 4] = [
        (&paths.content, RecursiveMode::Recursive),
        (&paths.templates, RecursiveMode::Recursive),
        (&paths.assets, RecursiveMode::Recursive),
        (&paths.config_path, RecursiveMode::NonRecursive),
    ];

    let mut watched = Vec::new();
    for (path, mode) in targets {
        if path.exists() {
            watcher
                .watch(path, mode)
                .with_context(|| format!("Failed to watch {}", path.display()))?;
            watched.push(
                path.strip_prefix(&paths.root)
                    .unwrap_or(path)
                    .display()
                    .to_string(),
            );
        }
    }

    log!("watch"; "watching: {}", watched.join(", "));
    Ok(())
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Rebuild Loop
// =============================================================================

/// Run one rebuild. Dev-mode build failures are logged, not fatal; the
/// author fixes the content and saves again.
fn rebuild(paths: &SitePaths) {
    if let Err(err) = build_site(paths) {
        log!("error"; "build failed: {err:#}");
    }
}

/// Drain any events that piled up while a build was running, feeding them
/// to the scheduler as one coalesced request.
fn drain_events(
    rx: &Receiver<notify::Result<Event>>,
    scheduler: &mut RebuildScheduler,
) {
    while let Ok(result) = rx.try_recv() {
        if let Ok(event) = result
            && is_relevant(&event)
            && event.paths.iter().any(|p| !is_temp_file(p))
        {
            scheduler.request();
        }
    }
}

/// Start blocking file watcher with debouncing and coalesced rebuilds.
pub fn watch_for_changes_blocking(paths: &SitePaths) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, paths)?;

    let mut debouncer = Debouncer::new();
    let mut scheduler = RebuildScheduler::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                debouncer.add(event);
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                debouncer.take();
                if scheduler.request() {
                    loop {
                        rebuild(paths);
                        drain_events(&rx, &mut scheduler);
                        if !scheduler.completed() {
                            break;
                        }
                    }
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // Other cases: irrelevant events, timeout without ready, etc.
            _ => {}
        }
    }

    Ok(())
}
