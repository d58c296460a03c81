// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission analyzer: `path → "0ppp"` (last 4 octal digits of
//! mode), descriptive and diff (ADD/DELETE/CHANGE on string inequality).

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;

use async_trait::async_trait;
use pw_core::model::{AnalysisResultEntry, FileResult, FileResultState, FileType, PreparedArgument, ResultKind};
use pw_core::trigger::{DiffPair, Trigger};

use crate::analyzer::{classify_and_mark, Analyzer, AnalyzerContext};
use crate::diff::diff_keys;
use crate::error::EngineError;

fn format_mode(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}

#[derive(Clone)]
struct Snapshot {
    mode: String,
    file_type: FileType,
}

#[derive(Default)]
pub struct PermissionAnalyzer {
    per_trigger: HashMap<Trigger, HashMap<String, Snapshot>>,
}

impl PermissionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Analyzer for PermissionAnalyzer {
    async fn run_analysis(
        &mut self,
        trigger: Trigger,
        argument: &[PreparedArgument],
        _suite: Option<&str>,
        ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError> {
        let mut snapshot = HashMap::new();
        for arg in argument {
            let meta = match std::fs::metadata(&arg.absolute_path) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %arg.absolute_path.display(), error = %e, "permission: stat failed");
                    continue;
                }
            };
            let file_type = classify_and_mark(ctx, &arg.absolute_path, &arg.relative_path).await?;
            let mode = format_mode(meta.permissions().mode());
            snapshot.insert(
                arg.relative_path.to_string_lossy().to_string(),
                Snapshot { mode, file_type },
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
            state.permissions = Some(snap.mode.clone());
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
            state.permissions = Some(snap.mode.clone());
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
            state.permissions = Some(snap.mode.clone());
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
            if before_snap.mode == after_snap.mode {
                continue;
            }
            let mut before_state = FileResultState::at(pair.before);
            before_state.permissions = Some(before_snap.mode.clone());
            let mut after_state = FileResultState::at(pair.after);
            after_state.permissions = Some(after_snap.mode.clone());
            out.push(AnalysisResultEntry::FileSystem(FileResult {
                path,
                kind: ResultKind::Change,
                file_type: after_snap.file_type,
                states: vec![before_state, after_state],
            }));
        }
    }
}
