// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ChecksumFileWrite analyzer: `path → (sha256, contents?)`,
//! descriptive and diff (ADD/DELETE/CHANGE on sha256 inequality).

use std::collections::HashMap;

use async_trait::async_trait;
use pw_core::model::{AnalysisResultEntry, FileResult, FileResultState, FileType, PreparedArgument, ResultKind};
use pw_core::trigger::{DiffPair, Trigger};

use crate::analyzer::{classify_and_mark, Analyzer, AnalyzerContext};
use crate::analyzers::hashes::sha256_hex;
use crate::diff::diff_keys;
use crate::error::EngineError;

/// Size above which a file's contents are not attached to the result; a
/// warning is logged rather than an error, since the result itself is
/// still otherwise complete.
const CONTENTS_SIZE_LIMIT: u64 = 1024 * 1024;

#[derive(Clone)]
struct Snapshot {
    sha256: String,
    contents: Option<Vec<u8>>,
    file_type: FileType,
}

#[derive(Default)]
pub struct ChecksumFileWriteAnalyzer {
    record_contents: bool,
    per_trigger: HashMap<Trigger, HashMap<String, Snapshot>>,
}

impl ChecksumFileWriteAnalyzer {
    pub fn new(record_contents: bool) -> Self {
        Self {
            record_contents,
            per_trigger: HashMap::new(),
        }
    }
}

#[async_trait]
impl Analyzer for ChecksumFileWriteAnalyzer {
    async fn run_analysis(
        &mut self,
        trigger: Trigger,
        argument: &[PreparedArgument],
        _suite: Option<&str>,
        ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError> {
        let mut snapshot = HashMap::new();
        for arg in argument {
            let contents = match std::fs::read(&arg.absolute_path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %arg.absolute_path.display(), error = %e, "checksum_file_write: read failed");
                    continue;
                }
            };
            let file_type = classify_and_mark(ctx, &arg.absolute_path, &arg.relative_path).await?;
            let sha256 = sha256_hex(&contents);
            let recorded_contents = if self.record_contents {
                if contents.len() as u64 > CONTENTS_SIZE_LIMIT {
                    tracing::warn!(path = %arg.absolute_path.display(), "checksum_file_write: contents requested but file too large to record");
                    None
                } else {
                    Some(contents)
                }
            } else {
                None
            };
            snapshot.insert(
                arg.relative_path.to_string_lossy().to_string(),
                Snapshot {
                    sha256,
                    contents: recorded_contents,
                    file_type,
                },
            );
        }
        self.per_trigger.insert(trigger, snapshot);
        Ok(())
    }

    fn add_descriptive_results(&mut self, trigger: Trigger, out: &mut Vec<AnalysisResultEntry>) {
        let Some(snapshot) = self.per_trigger.get(&trigger) else {
            return;
        };
        for (path, snap) in snapshot {
            let mut state = FileResultState::at(trigger);
            state.sha256 = Some(snap.sha256.clone());
            state.contents = snap.contents.clone();
            out.push(AnalysisResultEntry::FileSystem(FileResult {
                path: path.clone(),
                kind: ResultKind::Descriptive,
                file_type: snap.file_type,
                states: vec![state],
            }));
        }
    }

    fn add_diff_results(&mut self, pair: DiffPair, out: &mut Vec<AnalysisResultEntry>) {
        let before = self.per_trigger.get(&pair.before);
        let after = self.per_trigger.get(&pair.after);
        let (common, added, removed) = diff_keys(before, after);

        for path in added {
            // `added` only contains keys actually present in `after`.
            let Some(snap) = after.and_then(|a| a.get(&path)) else {
                continue;
            };
            let mut state = FileResultState::at(pair.after);
            state.sha256 = Some(snap.sha256.clone());
            state.contents = snap.contents.clone();
            out.push(AnalysisResultEntry::FileSystem(FileResult {
                path,
                kind: ResultKind::Add,
                file_type: snap.file_type,
                states: vec![state],
            }));
        }
        for path in removed {
            // `removed` only contains keys actually present in `before`.
            let Some(snap) = before.and_then(|b| b.get(&path)) else {
                continue;
            };
            let mut state = FileResultState::at(pair.before);
            state.sha256 = Some(snap.sha256.clone());
            state.contents = snap.contents.clone();
            out.push(AnalysisResultEntry::FileSystem(FileResult {
                path,
                kind: ResultKind::Delete,
                file_type: snap.file_type,
                states: vec![state],
            }));
        }
        for path in common {
            // `common` only contains keys present in both snapshots.
            let (Some(before_snap), Some(after_snap)) =
                (before.and_then(|b| b.get(&path)), after.and_then(|a| a.get(&path)))
            else {
                continue;
            };
            if before_snap.sha256 == after_snap.sha256 {
                continue;
            }
            let mut before_state = FileResultState::at(pair.before);
            before_state.sha256 = Some(before_snap.sha256.clone());
            before_state.contents = before_snap.contents.clone();
            let mut after_state = FileResultState::at(pair.after);
            after_state.sha256 = Some(after_snap.sha256.clone());
            after_state.contents = after_snap.contents.clone();
            out.push(AnalysisResultEntry::FileSystem(FileResult {
                path,
                kind: ResultKind::Change,
                file_type: after_snap.file_type,
                states: vec![before_state, after_state],
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_adapters::FileClassifier;
    use tempfile::tempdir;

    fn ctx_parts() -> (FileClassifier, crate::analyzer::PackageBinaries, crate::suite::SuiteDeduper) {
        (
            FileClassifier::new(),
            crate::analyzer::PackageBinaries::new(),
            crate::suite::SuiteDeduper::new(),
        )
    }

    #[tokio::test]
    async fn change_is_detected_on_sha256_inequality() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("f");
        let (classifier, binaries, deduper) = ctx_parts();
        let ctx = AnalyzerContext {
            file_classifier: &classifier,
            package_binaries: &binaries,
            suite_deduper: &deduper,
        };

        let mut analyzer = ChecksumFileWriteAnalyzer::new(false);
        std::fs::write(&path, b"v1").expect("write v1");
        let arg = PreparedArgument {
            absolute_path: path.clone(),
            relative_path: "f".into(),
        };
        analyzer
            .run_analysis(Trigger::Extract, &[arg.clone()], None, &ctx)
            .await
            .expect("run extract");

        std::fs::write(&path, b"v2").expect("write v2");
        analyzer
            .run_analysis(Trigger::Install, &[arg], None, &ctx)
            .await
            .expect("run install");

        let pair = DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair");
        let mut out = Vec::new();
        analyzer.add_diff_results(pair, &mut out);
        assert_eq!(out.len(), 1);
        let AnalysisResultEntry::FileSystem(result) = &out[0] else {
            panic!("expected file-system entry");
        };
        assert_eq!(result.kind, ResultKind::Change);
        assert_eq!(result.states.len(), 2);
    }
}
