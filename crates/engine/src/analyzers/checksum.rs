// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksum analyzer: `path → (md5, sha1, sha256)` from file
//! contents, descriptive only.

use std::collections::HashMap;

use async_trait::async_trait;
use pw_core::model::{AnalysisResultEntry, FileResult, FileResultState, PreparedArgument, ResultKind};
use pw_core::trigger::{DiffPair, Trigger};

use crate::analyzer::{classify_and_mark, Analyzer, AnalyzerContext};
use crate::analyzers::hashes::hash_all;
use crate::error::EngineError;

#[derive(Default)]
pub struct ChecksumAnalyzer {
    per_trigger: HashMap<Trigger, Vec<FileResult>>,
}

impl ChecksumAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Analyzer for ChecksumAnalyzer {
    async fn run_analysis(
        &mut self,
        trigger: Trigger,
        argument: &[PreparedArgument],
        _suite: Option<&str>,
        ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError> {
        let mut results = Vec::with_capacity(argument.len());
        for arg in argument {
            let contents = match std::fs::read(&arg.absolute_path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %arg.absolute_path.display(), error = %e, "checksum: read failed");
                    continue;
                }
            };
            let file_type = classify_and_mark(ctx, &arg.absolute_path, &arg.relative_path).await?;
            let checksums = hash_all(&contents);
            let mut state = FileResultState::at(trigger);
            state.md5 = Some(checksums.md5);
            state.sha1 = Some(checksums.sha1);
            state.sha256 = Some(checksums.sha256);
            results.push(FileResult {
                path: arg.relative_path.to_string_lossy().to_string(),
                kind: ResultKind::Descriptive,
                file_type,
                states: vec![state],
            });
        }
        self.per_trigger.entry(trigger).or_default().extend(results);
        Ok(())
    }

    fn add_descriptive_results(&mut self, trigger: Trigger, out: &mut Vec<AnalysisResultEntry>) {
        if let Some(results) = self.per_trigger.remove(&trigger) {
            out.extend(results.into_iter().map(AnalysisResultEntry::FileSystem));
        }
    }

    fn add_diff_results(&mut self, _pair: DiffPair, _out: &mut Vec<AnalysisResultEntry>) {}
}
