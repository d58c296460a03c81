// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-path file-type memoization, shared by all file analyzers.
//! Classification is idempotent per path within one broker run: a second
//! classification of the same path never re-invokes the probe.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use pw_core::model::FileType;
use pw_shell::probes;
use pw_shell::subprocess::run_with_timeout;

use crate::error::AdapterError;

#[derive(Default)]
pub struct FileClassifier {
    memo: Mutex<HashMap<String, FileType>>,
}

impl FileClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn classify(&self, path: &str) -> Result<FileType, AdapterError> {
        if let Some(cached) = self.memo.lock().get(path).copied() {
            return Ok(cached);
        }
        let cmd = probes::file_command(path);
        let output = run_with_timeout(cmd, Duration::from_secs(10))
            .await
            .map_err(|e| AdapterError::FileClassifier(format!("file classifier probe failed: {e}")))?;
        let file_type = probes::classify_file_output(&String::from_utf8_lossy(&output.stdout));
        self.memo.lock().insert(path.to_string(), file_type);
        Ok(file_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifies_and_caches() {
        let classifier = FileClassifier::new();
        let t = classifier.classify("/bin/sh").await.expect("classify");
        // Whatever the real probe returns, a repeat call must hit the memo
        // rather than re-invoke the probe — checked indirectly via the
        // cached map having exactly one entry.
        let _ = t;
        assert_eq!(classifier.memo.lock().len(), 1);
        let _ = classifier.classify("/bin/sh").await.expect("classify again");
        assert_eq!(classifier.memo.lock().len(), 1);
    }
}
