//! Directory watcher - debounced external-change detection
//!
//! Watches one collection directory (non-recursive) and turns raw filesystem
//! notifications into record-level [`FileChange`] events:
//!
//! - every notification only *schedules* a per-file check after a debounce
//!   window; another notification for the same file resets the window, it
//!   never stacks
//! - when a check fires, the file's current state on disk is truth: missing
//!   and previously known means `Deleted`, present means `Created` or
//!   `Updated` depending on whether the file was known
//! - our own writes are suppressed: a record marked as saving stays
//!   suppressed while the write runs and for a grace window after it
//!   completes, absorbing the trailing notifications the write itself caused
//!
//! Files that fail to decode are skipped with a warning; a directory scan is
//! never aborted by one bad file. Listener panics are caught and logged.

use crate::codec::{self, DecodedRecord};
use crate::paths;
use folio_core::{Error, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default debounce window between a notification and the file check
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Default suppression window after one of our own writes completes
pub const DEFAULT_GRACE: Duration = Duration::from_millis(200);

/// How often the worker thread looks for due checks
const TICK: Duration = Duration::from_millis(10);

/// A record-level change observed on disk
#[derive(Debug, Clone)]
pub enum FileChange {
    /// A file appeared that we had no record for
    Created {
        id: String,
        decoded: DecodedRecord,
        stale: bool,
    },
    /// A known file's content changed
    Updated {
        id: String,
        decoded: DecodedRecord,
        stale: bool,
    },
    /// A known file disappeared
    Deleted { id: String },
}

impl FileChange {
    /// The record id the change concerns
    pub fn id(&self) -> &str {
        match self {
            FileChange::Created { id, .. }
            | FileChange::Updated { id, .. }
            | FileChange::Deleted { id } => id,
        }
    }
}

type Listener = Box<dyn Fn(&FileChange) + Send + Sync>;

/// Decides whether freshly decoded content leaves a record's embeddings stale
pub type StaleCheck = Box<dyn Fn(&str, &DecodedRecord) -> bool + Send + Sync>;

enum Saving {
    InProgress,
    Grace(Instant),
}

struct Shared {
    dir: PathBuf,
    debounce: Duration,
    grace: Duration,
    /// filename → record id, for files we have already seen
    known: Mutex<HashMap<String, String>>,
    /// filename → deadline of the scheduled check
    pending: Mutex<HashMap<String, Instant>>,
    /// Self-write suppression, keyed by the sanitized filename form of the
    /// record id so an unbound file still matches its `mark_saving` entry
    saving: Mutex<HashMap<String, Saving>>,
    listeners: Mutex<Vec<Listener>>,
    stale_check: StaleCheck,
    running: AtomicBool,
}

/// Debounced watcher over one collection directory
pub struct DirWatcher {
    shared: Arc<Shared>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DirWatcher {
    /// Watch `dir` with the given windows.
    ///
    /// The startup scan seeds the known-files map from what is already on
    /// disk without emitting any event; only changes after this call are
    /// reported.
    ///
    /// # Errors
    ///
    /// `Io` if the directory cannot be scanned, `Watch` if the OS watch
    /// cannot be established.
    pub fn start(
        dir: &Path,
        debounce: Duration,
        grace: Duration,
        stale_check: StaleCheck,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            dir: dir.to_path_buf(),
            debounce,
            grace,
            known: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            saving: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            stale_check,
            running: AtomicBool::new(true),
        });

        // Seed known files silently
        {
            let mut known = shared.known.lock();
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Some(stem) = paths::id_from_filename(&name) {
                    known.insert(name.clone(), stem.to_string());
                }
            }
            tracing::debug!(
                target: "folio::watch",
                dir = %dir.display(),
                known = known.len(),
                "watching directory"
            );
        }

        let notify_shared = shared.clone();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            match event {
                Ok(event) => notify_shared.schedule(&event.paths),
                Err(e) => {
                    tracing::warn!(target: "folio::watch", error = %e, "watch error")
                }
            }
        })
        .map_err(|e| Error::Watch(e.to_string()))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(e.to_string()))?;

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("folio-watch".to_string())
            .spawn(move || worker_shared.run())
            .map_err(Error::Io)?;

        Ok(DirWatcher {
            shared,
            watcher: Mutex::new(Some(watcher)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Register a change listener
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&FileChange) + Send + Sync + 'static,
    {
        self.shared.listeners.lock().push(Box::new(listener));
    }

    /// Suppress events for a record while we write its file
    pub fn mark_saving(&self, id: &str) {
        self.shared
            .saving
            .lock()
            .insert(paths::sanitize_filename(id), Saving::InProgress);
    }

    /// Start the post-write grace window for a record
    pub fn complete_saving(&self, id: &str) {
        self.shared.saving.lock().insert(
            paths::sanitize_filename(id),
            Saving::Grace(Instant::now() + self.shared.grace),
        );
    }

    /// Bind a filename to a record id (after a load or save), so later
    /// events for the file carry the right id even when the frontmatter id
    /// differs from the file stem.
    pub fn register_known(&self, filename: &str, id: &str) {
        self.shared
            .known
            .lock()
            .insert(filename.to_string(), id.to_string());
    }

    /// Drop a filename binding (after we delete the file ourselves)
    pub fn forget_known(&self, filename: &str) {
        self.shared.known.lock().remove(filename);
    }

    /// The id a filename is currently bound to
    pub fn known_id(&self, filename: &str) -> Option<String> {
        self.shared.known.lock().get(filename).cloned()
    }

    /// Stop watching: cancel pending checks, detach the OS watch, join the
    /// worker. Idempotent.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.pending.lock().clear();
        *self.watcher.lock() = None;
        if let Some(worker) = self.worker.lock().take() {
            // The worker itself can trigger a stop (last handle dropped from
            // a listener); it cannot join itself, so let it unwind on its own
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::error!(target: "folio::watch", "watch worker panicked");
            }
        }
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    /// Schedule (or reschedule) checks for notified markdown files
    fn schedule(&self, changed: &[PathBuf]) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let deadline = Instant::now() + self.debounce;
        let mut pending = self.pending.lock();
        for path in changed {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if paths::id_from_filename(&name).is_none() {
                continue;
            }
            // Overwriting resets the window instead of stacking checks
            pending.insert(name, deadline);
        }
    }

    fn run(self: Arc<Self>) {
        while self.running.load(Ordering::Acquire) {
            thread::sleep(TICK);
            let due: Vec<String> = {
                let now = Instant::now();
                let mut pending = self.pending.lock();
                let due: Vec<String> = pending
                    .iter()
                    .filter(|(_, deadline)| **deadline <= now)
                    .map(|(name, _)| name.clone())
                    .collect();
                for name in &due {
                    pending.remove(name);
                }
                due
            };
            for name in due {
                self.check(&name);
            }
        }
    }

    /// Debounce fired: reconcile one file against its known state
    fn check(&self, filename: &str) {
        let bound_id = self.known.lock().get(filename).cloned();
        let fallback_id = paths::id_from_filename(filename).unwrap_or(filename);
        let id = bound_id.clone().unwrap_or_else(|| fallback_id.to_string());

        if self.suppressed(&id) {
            tracing::trace!(target: "folio::watch", id = %id, "own write suppressed");
            return;
        }

        let path = self.dir.join(filename);
        if !path.exists() {
            if bound_id.is_some() {
                self.known.lock().remove(filename);
                self.emit(&FileChange::Deleted { id });
            }
            return;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(target: "folio::watch", file = %filename, error = %e, "unreadable file skipped");
                return;
            }
        };
        let decoded = match codec::decode(&text) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(target: "folio::watch", file = %filename, error = %e, "undecodable file skipped");
                return;
            }
        };

        let id = decoded
            .id
            .clone()
            .unwrap_or_else(|| fallback_id.to_string());
        let existed = bound_id.is_some();
        self.known.lock().insert(filename.to_string(), id.clone());

        let stale = (self.stale_check)(&id, &decoded);
        let change = if existed {
            FileChange::Updated { id, decoded, stale }
        } else {
            FileChange::Created { id, decoded, stale }
        };
        self.emit(&change);
    }

    fn suppressed(&self, id: &str) -> bool {
        let key = paths::sanitize_filename(id);
        let mut saving = self.saving.lock();
        match saving.get(&key) {
            Some(Saving::InProgress) => true,
            Some(Saving::Grace(deadline)) => {
                if Instant::now() < *deadline {
                    true
                } else {
                    saving.remove(&key);
                    false
                }
            }
            None => false,
        }
    }

    fn emit(&self, change: &FileChange) {
        tracing::debug!(
            target: "folio::watch",
            id = %change.id(),
            kind = match change {
                FileChange::Created { .. } => "created",
                FileChange::Updated { .. } => "updated",
                FileChange::Deleted { .. } => "deleted",
            },
            "external change"
        );
        let listeners = self.listeners.lock();
        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(change))).is_err() {
                tracing::error!(target: "folio::watch", id = %change.id(), "change listener panicked");
            }
        }
    }
}
