// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! InotifyFile analyzer: an event-counter over watched paths;
//! the first call per path also starts a watch; diff-only, emitting ADD
//! for every path in `after \ before` of the counter key-sets.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use pw_core::model::{AnalysisResultEntry, FileResult, FileResultState, PreparedArgument, ResultKind};
use pw_core::trigger::{DiffPair, Trigger};

use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::analyzers::inotify_manager::InotifyFacility;
use crate::error::EngineError;

pub struct InotifyFileAnalyzer {
    facility: Arc<dyn InotifyFacility>,
    snapshots: HashMap<Trigger, IndexMap<PathBuf, u64>>,
    drained: HashSet<Trigger>,
    relative_names: HashMap<PathBuf, String>,
}

impl InotifyFileAnalyzer {
    pub fn new(facility: Arc<dyn InotifyFacility>) -> Self {
        Self {
            facility,
            snapshots: HashMap::new(),
            drained: HashSet::new(),
            relative_names: HashMap::new(),
        }
    }
}

#[async_trait]
impl Analyzer for InotifyFileAnalyzer {
    async fn run_analysis(
        &mut self,
        trigger: Trigger,
        argument: &[PreparedArgument],
        _suite: Option<&str>,
        _ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError> {
        for arg in argument {
            self.facility.watch(&arg.absolute_path)?;
            self.relative_names
                .entry(arg.absolute_path.clone())
                .or_insert_with(|| arg.relative_path.to_string_lossy().to_string());
        }
        // One drained snapshot per trigger: a second call for the same
        // trigger (e.g. a second analysis descriptor sharing this module)
        // reuses the already-drained counter rather than draining again.
        if self.drained.insert(trigger) {
            let snapshot = self.facility.drain();
            self.snapshots.insert(trigger, snapshot);
        }
        Ok(())
    }

    fn add_diff_results(&mut self, pair: DiffPair, out: &mut Vec<AnalysisResultEntry>) {
        let empty = IndexMap::new();
        let before = self.snapshots.get(&pair.before).unwrap_or(&empty);
        let after = self.snapshots.get(&pair.after).unwrap_or(&empty);

        // Multiset subtraction (`after - before`), not a set difference: a
        // path already present in `before` still counts as affected if its
        // event count rose between the two triggers.
        for path in after.keys() {
            let before_count = before.get(path).copied().unwrap_or(0);
            let after_count = after.get(path).copied().unwrap_or(0);
            if after_count <= before_count {
                continue;
            }
            let name = self
                .relative_names
                .get(path)
                .cloned()
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            out.push(AnalysisResultEntry::FileSystem(FileResult {
                path: name,
                kind: ResultKind::Add,
                file_type: pw_core::model::FileType::Other,
                states: vec![FileResultState::at(pair.after)],
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::inotify_manager::FakeInotifyManager;

    #[tokio::test]
    async fn emits_add_for_newly_seen_path_only() {
        let fake = Arc::new(FakeInotifyManager::new());

        let classifier = pw_adapters::FileClassifier::new();
        let binaries = crate::analyzer::PackageBinaries::new();
        let deduper = crate::suite::SuiteDeduper::new();
        let ctx = AnalyzerContext {
            file_classifier: &classifier,
            package_binaries: &binaries,
            suite_deduper: &deduper,
        };

        let mut analyzer = InotifyFileAnalyzer::new(fake.clone() as Arc<dyn InotifyFacility>);
        let arg = PreparedArgument {
            absolute_path: "/tmp/P".into(),
            relative_path: "P".into(),
        };

        analyzer
            .run_analysis(Trigger::Extract, &[], None, &ctx)
            .await
            .expect("extract snapshot (no events yet)");
        fake.record_event(std::path::Path::new("/tmp/P"));
        analyzer
            .run_analysis(Trigger::Install, &[arg], None, &ctx)
            .await
            .expect("install snapshot");

        let pair = DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair");
        let mut out = Vec::new();
        analyzer.add_diff_results(pair, &mut out);
        assert_eq!(out.len(), 1);
        let AnalysisResultEntry::FileSystem(result) = &out[0] else {
            panic!("expected file-system entry");
        };
        assert_eq!(result.kind, ResultKind::Add);
        assert_eq!(result.path, "P");
    }

    /// A path present in both snapshots still registers as affected if its
    /// event count rose between them — multiset subtraction, not a
    /// saturating "have we ever seen this path" check.
    #[tokio::test]
    async fn emits_add_for_a_path_whose_count_rose_even_if_already_seen() {
        let fake = Arc::new(FakeInotifyManager::new());

        let classifier = pw_adapters::FileClassifier::new();
        let binaries = crate::analyzer::PackageBinaries::new();
        let deduper = crate::suite::SuiteDeduper::new();
        let ctx = AnalyzerContext {
            file_classifier: &classifier,
            package_binaries: &binaries,
            suite_deduper: &deduper,
        };

        let mut analyzer = InotifyFileAnalyzer::new(fake.clone() as Arc<dyn InotifyFacility>);
        let arg = PreparedArgument {
            absolute_path: "/tmp/P".into(),
            relative_path: "P".into(),
        };

        fake.record_event(std::path::Path::new("/tmp/P"));
        analyzer
            .run_analysis(Trigger::Extract, &[arg.clone()], None, &ctx)
            .await
            .expect("extract snapshot (one event already recorded)");
        fake.record_event(std::path::Path::new("/tmp/P"));
        analyzer
            .run_analysis(Trigger::Install, &[arg], None, &ctx)
            .await
            .expect("install snapshot (count rose)");

        let pair = DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair");
        let mut out = Vec::new();
        analyzer.add_diff_results(pair, &mut out);
        assert_eq!(out.len(), 1, "path already present in `before` still counts when its count rose");
        let AnalysisResultEntry::FileSystem(result) = &out[0] else {
            panic!("expected file-system entry");
        };
        assert_eq!(result.kind, ResultKind::Add);
        assert_eq!(result.path, "P");
    }

    #[tokio::test]
    async fn no_add_when_count_is_unchanged_between_triggers() {
        let fake = Arc::new(FakeInotifyManager::new());

        let classifier = pw_adapters::FileClassifier::new();
        let binaries = crate::analyzer::PackageBinaries::new();
        let deduper = crate::suite::SuiteDeduper::new();
        let ctx = AnalyzerContext {
            file_classifier: &classifier,
            package_binaries: &binaries,
            suite_deduper: &deduper,
        };

        let mut analyzer = InotifyFileAnalyzer::new(fake.clone() as Arc<dyn InotifyFacility>);
        let arg = PreparedArgument {
            absolute_path: "/tmp/P".into(),
            relative_path: "P".into(),
        };

        fake.record_event(std::path::Path::new("/tmp/P"));
        analyzer
            .run_analysis(Trigger::Extract, &[arg.clone()], None, &ctx)
            .await
            .expect("extract snapshot");
        analyzer
            .run_analysis(Trigger::Install, &[arg], None, &ctx)
            .await
            .expect("install snapshot (no new events)");

        let pair = DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair");
        let mut out = Vec::new();
        analyzer.add_diff_results(pair, &mut out);
        assert!(out.is_empty());
    }
}
