// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Analyzer` trait and the process-wide package-binaries
//! context analyzers consume and contribute to.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pw_core::model::{AnalysisResultEntry, PreparedArgument};
use pw_core::trigger::{DiffPair, Trigger};

use crate::error::EngineError;
use crate::suite::SuiteDeduper;

/// Process-wide set of paths observed as `BINARY` under suite `"package"`.
/// Passed explicitly to every analyzer and to `binary_launcher` rather
/// than kept as global state.
#[derive(Clone, Default)]
pub struct PackageBinaries {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl PackageBinaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_binary(&self, path: &Path) {
        self.inner.lock().insert(path.to_path_buf());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.lock().contains(path)
    }

    pub fn snapshot(&self) -> HashSet<PathBuf> {
        self.inner.lock().clone()
    }
}

/// Context shared across every analyzer invocation in one analysis run.
pub struct AnalyzerContext<'a> {
    pub file_classifier: &'a pw_adapters::file_classifier::FileClassifier,
    pub package_binaries: &'a PackageBinaries,
    pub suite_deduper: &'a SuiteDeduper,
}

/// One analyzer capability: invoked once per `(analysis,
/// trigger)` it cares about, then asked to emit descriptive and/or diff
/// results once all its triggers have run.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn run_analysis(
        &mut self,
        trigger: Trigger,
        argument: &[PreparedArgument],
        suite: Option<&str>,
        ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError>;

    fn add_descriptive_results(&mut self, trigger: Trigger, out: &mut Vec<AnalysisResultEntry>) {
        let _ = (trigger, out);
    }

    fn add_diff_results(&mut self, pair: DiffPair, out: &mut Vec<AnalysisResultEntry>) {
        let _ = (pair, out);
    }
}

/// Classify `path`'s file type through the shared memo and, when it comes
/// back `BINARY`, mark it in the process-wide package-binaries set. Shared
/// by every concrete file analyzer so the classify-then-mark sequence is
/// not duplicated per analyzer.
pub async fn classify_and_mark(
    ctx: &AnalyzerContext<'_>,
    absolute_path: &Path,
    relative_path: &Path,
) -> Result<pw_core::model::FileType, EngineError> {
    let path_str = absolute_path.to_string_lossy().to_string();
    let file_type = ctx
        .file_classifier
        .classify(&path_str)
        .await
        .map_err(|e| EngineError::Recoverable(format!("classify {path_str}: {e}")))?;
    if file_type == pw_core::model::FileType::Binary {
        ctx.package_binaries.mark_binary(relative_path);
    }
    Ok(file_type)
}
