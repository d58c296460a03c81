// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suite Deduper: a shared, mutable table keyed by `(suite, discriminator,
//! path)` so analyzers contributing to the same suite see and mutate the
//! same file-result record instead of producing independent copies.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pw_core::model::FileResult;

/// Shared, mutable file-result record. Every analyzer that resolves to the
/// same `(suite, discriminator, path)` key gets the same `Arc`, so a write
/// through one analyzer's handle is visible to every other holder.
pub type SharedFileResult = Arc<Mutex<FileResult>>;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct DeduperKey {
    suite: String,
    discriminator: String,
    path: String,
}

/// Shared per-suite file-result table: every caller that resolves to the
/// same key gets the same pointer, so a mutation through one handle is
/// visible to every other holder.
#[derive(Default)]
pub struct SuiteDeduper {
    records: Mutex<HashMap<DeduperKey, SharedFileResult>>,
}

impl SuiteDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing shared record for `(suite, discriminator, path)`.
    pub fn get(&self, suite: &str, discriminator: &str, path: &str) -> Option<SharedFileResult> {
        let key = DeduperKey {
            suite: suite.to_string(),
            discriminator: discriminator.to_string(),
            path: path.to_string(),
        };
        self.records.lock().get(&key).cloned()
    }

    /// Insert a newly allocated record under `(suite, discriminator, path)`,
    /// returning the record that ends up owning the key (the one just
    /// inserted, or a record some concurrent caller beat us to).
    pub fn put(&self, suite: &str, discriminator: &str, path: &str, record: SharedFileResult) -> SharedFileResult {
        let key = DeduperKey {
            suite: suite.to_string(),
            discriminator: discriminator.to_string(),
            path: path.to_string(),
        };
        let mut records = self.records.lock();
        records.entry(key).or_insert(record).clone()
    }

    /// Fetch the shared record for this key, allocating one from `make` on
    /// first use. Mirrors the guest's `Get`-then-`Put` pattern as one
    /// race-free call.
    pub fn get_or_insert_with(
        &self,
        suite: &str,
        discriminator: &str,
        path: &str,
        make: impl FnOnce() -> FileResult,
    ) -> SharedFileResult {
        let key = DeduperKey {
            suite: suite.to_string(),
            discriminator: discriminator.to_string(),
            path: path.to_string(),
        };
        let mut records = self.records.lock();
        records
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(make())))
            .clone()
    }

    /// Drain every registered record, paired with the suite name it was
    /// registered under. Called once, after every analysis's `run_analysis`
    /// and `collect_results` have both run to completion, so every record
    /// returned already reflects every analyzer's merged contribution.
    pub fn drain(&self) -> Vec<(String, SharedFileResult)> {
        self.records
            .lock()
            .drain()
            .map(|(key, record)| (key.suite, record))
            .collect()
    }
}

/// Merge one suite analyzer's `FileResult` into the deduper: the first
/// analyzer to reach `(suite, discriminator, path)` registers the record;
/// every later analyzer for the same key merges its states into the
/// already-registered record instead of contributing an independent copy.
/// Never renders anything itself — the merged records are rendered once, in
/// one pass, by a [`SuiteDeduper::drain`] call issued after every analyzer
/// has merged in.
pub fn merge_into_deduper(deduper: &SuiteDeduper, suite: &str, discriminator: &str, file_result: FileResult) {
    let states = file_result.states.clone();
    let record = deduper.get_or_insert_with(suite, discriminator, &file_result.path, || file_result);
    merge_states(&mut record.lock().states, states);
}

/// Merge `incoming` states into `existing` by trigger: a state already
/// present for that trigger has its fields overwritten field-by-field
/// (an incoming `None` never clobbers a value `existing` already has); a
/// trigger not yet present is appended.
fn merge_states(existing: &mut Vec<pw_core::model::FileResultState>, incoming: Vec<pw_core::model::FileResultState>) {
    for state in incoming {
        match existing.iter_mut().find(|s| s.trigger == state.trigger) {
            Some(slot) => {
                slot.permissions = state.permissions.or_else(|| slot.permissions.take());
                slot.md5 = state.md5.or_else(|| slot.md5.take());
                slot.sha1 = state.sha1.or_else(|| slot.sha1.take());
                slot.sha256 = state.sha256.or_else(|| slot.sha256.take());
                slot.contents = state.contents.or_else(|| slot.contents.take());
            }
            None => existing.push(state),
        }
    }
}
