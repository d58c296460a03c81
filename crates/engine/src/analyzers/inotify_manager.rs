// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The kernel filesystem-event facility, contracted through
//! `watch(path, eventMask)` / `drain() -> counter`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::error::EngineError;

/// How long to let accumulated events settle before a drain.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

pub trait InotifyFacility: Send + Sync {
    /// Register a watch on `path`. Watching an already-watched path is a
    /// no-op.
    fn watch(&self, path: &Path) -> Result<(), EngineError>;

    /// Settle, then return a snapshot of the cumulative per-path event
    /// counter.
    fn drain(&self) -> IndexMap<PathBuf, u64>;
}

pub struct NotifyInotifyManager {
    watcher: Mutex<RecommendedWatcher>,
    watched: Mutex<HashSet<PathBuf>>,
    counts: Arc<Mutex<IndexMap<PathBuf, u64>>>,
}

impl NotifyInotifyManager {
    pub fn new() -> Result<Self, EngineError> {
        let counts: Arc<Mutex<IndexMap<PathBuf, u64>>> = Arc::new(Mutex::new(IndexMap::new()));
        let handler_counts = counts.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else { return };
            let mut counts = handler_counts.lock();
            for path in event.paths {
                *counts.entry(path).or_insert(0) += 1;
            }
        })
        .map_err(|e| EngineError::Recoverable(format!("inotify watcher init: {e}")))?;
        Ok(Self {
            watcher: Mutex::new(watcher),
            watched: Mutex::new(HashSet::new()),
            counts,
        })
    }
}

impl InotifyFacility for NotifyInotifyManager {
    fn watch(&self, path: &Path) -> Result<(), EngineError> {
        let mut watched = self.watched.lock();
        if watched.contains(path) {
            return Ok(());
        }
        self.watcher
            .lock()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| EngineError::Recoverable(format!("inotify watch {}: {e}", path.display())))?;
        watched.insert(path.to_path_buf());
        Ok(())
    }

    fn drain(&self) -> IndexMap<PathBuf, u64> {
        std::thread::sleep(SETTLE_DELAY);
        self.counts.lock().clone()
    }
}

/// Test-only facility that lets a test script record events directly
/// instead of depending on a real kernel inotify backend.
#[cfg(test)]
pub struct FakeInotifyManager {
    watched: Mutex<HashSet<PathBuf>>,
    counts: Mutex<IndexMap<PathBuf, u64>>,
}

#[cfg(test)]
impl FakeInotifyManager {
    pub fn new() -> Self {
        Self {
            watched: Mutex::new(HashSet::new()),
            counts: Mutex::new(IndexMap::new()),
        }
    }

    pub fn record_event(&self, path: &Path) {
        *self.counts.lock().entry(path.to_path_buf()).or_insert(0) += 1;
    }
}

#[cfg(test)]
impl InotifyFacility for FakeInotifyManager {
    fn watch(&self, path: &Path) -> Result<(), EngineError> {
        self.watched.lock().insert(path.to_path_buf());
        Ok(())
    }

    fn drain(&self) -> IndexMap<PathBuf, u64> {
        self.counts.lock().clone()
    }
}
