// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::path::{Path, PathBuf};

use pw_core::model::{Package, PackageStatus};
use tracing::{info, warn};

use crate::error::QueueError;

/// A successfully claimed work item: the package descriptor (now
/// `PROCESSING`, `analysis_attempts` incremented) plus the path to the
/// pending sentinel the caller must remove at finalization.
pub struct ClaimedItem {
    pub package: Package,
    pub pending_path: PathBuf,
}

/// The shared-directory work queue, rooted at one NFS mount's `in/`/`out/`
/// pair (as seen from the guest/broker side).
pub struct WorkQueue {
    in_dir: PathBuf,
    out_dir: PathBuf,
    text_out: bool,
}

impl WorkQueue {
    pub fn new(in_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, text_out: bool) -> Self {
        Self {
            in_dir: in_dir.into(),
            out_dir: out_dir.into(),
            text_out,
        }
    }

    /// Publish one `AVAILABLE` package descriptor into `in/`, overwriting if
    /// it already exists (Dispatcher side).
    pub fn publish(&self, package: &Package) -> Result<(), QueueError> {
        fs::create_dir_all(&self.in_dir)?;
        let path = self.in_dir.join(package.basename());
        pw_wire::write_message(&path, package)?;
        Ok(())
    }

    fn pending_path(&self, basename: &str) -> PathBuf {
        self.out_dir.join(format!("{basename}.pending"))
    }

    /// Attempt the atomic claim protocol against every candidate
    /// currently in `in/`, in directory-iteration order, returning the first
    /// one successfully claimed.
    pub fn claim(&self) -> Result<ClaimedItem, QueueError> {
        fs::create_dir_all(&self.out_dir)?;
        let mut candidates: Vec<PathBuf> = fs::read_dir(&self.in_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        candidates.sort();

        for candidate in candidates {
            let basename = match candidate.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            match self.try_claim_one(&candidate, &basename) {
                Ok(item) => return Ok(item),
                Err(e) => {
                    warn!(item = %basename, error = %e, "could not claim candidate, trying next");
                    continue;
                }
            }
        }
        Err(QueueError::NoPackage)
    }

    /// One claim attempt against a single `in/X` candidate. Exclusive-create
    /// of `out/X.pending` is the only atomic step; everything else happens
    /// only after that step has already succeeded.
    fn try_claim_one(&self, candidate: &Path, basename: &str) -> Result<ClaimedItem, QueueError> {
        let pending_path = self.pending_path(basename);

        // Exclusive-create: fails if the sentinel already exists. This is
        // the sole correctness-bearing operation in the whole protocol.
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&pending_path)?;

        let mut package: Package = pw_wire::read_message(candidate)?;
        package.status = PackageStatus::Processing;
        package.analysis_attempts += 1;
        pw_wire::write_message(&pending_path, &package)?;
        fs::remove_file(candidate)?;
        info!(item = basename, "claimed work item");

        Ok(ClaimedItem {
            package,
            pending_path,
        })
    }

    /// Remove the pending sentinel at successful finalization only. A
    /// crashed VM worker must leave the sentinel in place so the item is
    /// never silently lost.
    pub fn release(&self, pending_path: &Path) -> Result<(), QueueError> {
        fs::remove_file(pending_path)?;
        Ok(())
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, WorkQueue) {
        let dir = tempdir().expect("tempdir");
        let in_dir = dir.path().join("in");
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&in_dir).expect("mkdir");
        let queue = WorkQueue::new(in_dir, out_dir, true);
        (dir, queue)
    }

    #[test]
    fn claims_published_item_exactly_once() {
        let (_dir, queue) = setup();
        let pkg = Package::new_available("emacspeak-ss", "1.12.1-1", "i386");
        queue.publish(&pkg).expect("publish");

        let claimed = queue.claim().expect("claim");
        assert_eq!(claimed.package.status, PackageStatus::Processing);
        assert_eq!(claimed.package.analysis_attempts, 1);

        // in/ entry consumed; no other candidate to claim.
        assert!(matches!(queue.claim(), Err(QueueError::NoPackage)));
    }

    #[test]
    fn concurrent_claim_one_winner_one_loser() {
        let (_dir, queue) = setup();
        let pkg = Package::new_available("foo", "1.0", "amd64");
        queue.publish(&pkg).expect("publish");

        let basename = pkg.basename();
        let candidate = queue.in_dir.join(&basename);
        // Simulate the second broker racing in after the first broker has
        // already created the sentinel but before it removed in/X.
        let pending = queue.pending_path(&basename);
        std::fs::create_dir_all(&queue.out_dir).expect("mkdir out");
        std::fs::write(&pending, b"").expect("pre-create sentinel");

        let result = queue.try_claim_one(&candidate, &basename);
        assert!(result.is_err());
    }

    #[test]
    fn release_removes_sentinel() {
        let (_dir, queue) = setup();
        let pkg = Package::new_available("foo", "1.0", "amd64");
        queue.publish(&pkg).expect("publish");
        let claimed = queue.claim().expect("claim");
        assert!(claimed.pending_path.exists());
        queue.release(&claimed.pending_path).expect("release");
        assert!(!claimed.pending_path.exists());
    }
}
