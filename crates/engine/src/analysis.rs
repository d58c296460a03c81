// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One loaded `(descriptor, trigger-set, analyzer)` bundle, the unit the
//! Broker's run loop drives.

use std::collections::HashSet;
use std::path::Path;

use pw_core::model::{AnalysisDescriptor, AnalysisResult, AnalysisResultEntry};
use pw_core::trigger::Trigger;

use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::argument::preprocess_argument;
use crate::error::EngineError;

pub struct Analysis {
    pub descriptor: AnalysisDescriptor,
    pub triggers: HashSet<Trigger>,
    pub analyzer: Box<dyn Analyzer>,
}

impl Analysis {
    pub fn new(descriptor: AnalysisDescriptor, triggers: HashSet<Trigger>, analyzer: Box<dyn Analyzer>) -> Self {
        Self {
            descriptor,
            triggers,
            analyzer,
        }
    }

    /// Invoke `RunAnalysis` for `trigger` iff this analysis's trigger set
    /// includes it: exactly once for every trigger in the set, never for
    /// one outside it.
    pub async fn run_if_relevant(
        &mut self,
        trigger: Trigger,
        extract_dir: &Path,
        ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError> {
        if !self.triggers.contains(&trigger) {
            return Ok(());
        }
        let mut prepared = Vec::new();
        for argument in &self.descriptor.arguments {
            prepared.extend(preprocess_argument(argument, extract_dir));
        }
        self.analyzer
            .run_analysis(trigger, &prepared, self.descriptor.suite.as_deref(), ctx)
            .await
    }

    /// Collect this analysis's contribution into one `AnalysisResult`. When
    /// the descriptor names a suite, every `FileSystem` entry is merged into
    /// the suite deduper instead of being returned directly: the suite's
    /// analyzers converge on one shared record per `(trigger-or-pair,
    /// path)`, which the Broker renders exactly once, after every
    /// analysis's `collect_results` has run, via [`crate::suite::SuiteDeduper::drain`].
    /// A suite-scoped analysis therefore always returns an empty result
    /// here (discarded by `ApplicationResult::add_analysis_result`); its
    /// real contribution surfaces later, under the suite's own name.
    pub fn collect_results(&mut self, ctx: &AnalyzerContext<'_>) -> AnalysisResult {
        let name = self
            .descriptor
            .suite
            .clone()
            .unwrap_or_else(|| self.descriptor.name.clone());
        let mut results: Vec<AnalysisResultEntry> = Vec::new();

        for trigger in &self.descriptor.descriptive_triggers {
            let mut entries = Vec::new();
            self.analyzer.add_descriptive_results(*trigger, &mut entries);
            self.push_entries(ctx, &format!("{trigger:?}"), entries, &mut results);
        }
        for pair in &self.descriptor.diff_pairs {
            let mut entries = Vec::new();
            self.analyzer.add_diff_results(*pair, &mut entries);
            self.push_entries(ctx, &format!("{:?}-{:?}", pair.before, pair.after), entries, &mut results);
        }

        AnalysisResult {
            analysis_name: name,
            results,
        }
    }

    fn push_entries(
        &self,
        ctx: &AnalyzerContext<'_>,
        discriminator: &str,
        entries: Vec<AnalysisResultEntry>,
        out: &mut Vec<AnalysisResultEntry>,
    ) {
        let Some(suite) = &self.descriptor.suite else {
            out.extend(entries);
            return;
        };
        for entry in entries {
            let AnalysisResultEntry::FileSystem(file_result) = entry else {
                out.push(entry);
                continue;
            };
            crate::suite::merge_into_deduper(ctx.suite_deduper, suite, discriminator, file_result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::ChecksumAnalyzer;
    use pw_core::model::Argument;
    use tempfile::tempdir;

    #[tokio::test]
    async fn runs_only_for_relevant_triggers_and_discards_empty_results() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("f"), b"hi").expect("write");

        let descriptor = AnalysisDescriptor {
            name: "checksum".into(),
            description: String::new(),
            category: String::new(),
            module: "checksum".into(),
            arguments: vec![Argument {
                string_args: vec!["f".into()],
                prepend_extract_dir: true,
                recursive_file_walk: false,
                excluded_patterns: vec![],
            }],
            descriptive_triggers: vec![Trigger::Extract],
            diff_pairs: vec![],
            suite: None,
        };
        let triggers = [Trigger::Extract].into_iter().collect();
        let mut analysis = Analysis::new(descriptor, triggers, Box::new(ChecksumAnalyzer::new()));

        let classifier = pw_adapters::FileClassifier::new();
        let binaries = crate::analyzer::PackageBinaries::new();
        let deduper = crate::suite::SuiteDeduper::new();
        let ctx = AnalyzerContext {
            file_classifier: &classifier,
            package_binaries: &binaries,
            suite_deduper: &deduper,
        };

        // INSTALL is not in this analysis's trigger set: must be a no-op.
        analysis
            .run_if_relevant(Trigger::Install, dir.path(), &ctx)
            .await
            .expect("no-op for irrelevant trigger");
        let empty_result = analysis.collect_results(&ctx);
        assert!(empty_result.is_empty());

        analysis
            .run_if_relevant(Trigger::Extract, dir.path(), &ctx)
            .await
            .expect("run for relevant trigger");
        let result = analysis.collect_results(&ctx);
        assert_eq!(result.results.len(), 1);
    }

    #[tokio::test]
    async fn suite_descriptors_merge_into_the_deduper_and_return_no_direct_results() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("f"), b"hi").expect("write");

        let descriptor = |module: &str| AnalysisDescriptor {
            name: module.to_string(),
            description: String::new(),
            category: String::new(),
            module: module.to_string(),
            arguments: vec![Argument {
                string_args: vec!["f".into()],
                prepend_extract_dir: true,
                recursive_file_walk: false,
                excluded_patterns: vec![],
            }],
            descriptive_triggers: vec![Trigger::Extract],
            diff_pairs: vec![],
            suite: Some("package".into()),
        };
        let triggers = || [Trigger::Extract].into_iter().collect();
        let mut checksum = Analysis::new(descriptor("checksum"), triggers(), Box::new(ChecksumAnalyzer::new()));
        let mut permission = Analysis::new(
            descriptor("permission"),
            triggers(),
            Box::new(crate::analyzers::PermissionAnalyzer::new()),
        );

        let classifier = pw_adapters::FileClassifier::new();
        let binaries = crate::analyzer::PackageBinaries::new();
        let deduper = crate::suite::SuiteDeduper::new();
        let ctx = AnalyzerContext {
            file_classifier: &classifier,
            package_binaries: &binaries,
            suite_deduper: &deduper,
        };

        checksum.run_if_relevant(Trigger::Extract, dir.path(), &ctx).await.expect("checksum run");
        permission.run_if_relevant(Trigger::Extract, dir.path(), &ctx).await.expect("permission run");

        // Both analyses contribute to the same suite; neither returns a
        // direct result here, since rendering happens once, later, from the
        // deduper — see `suite::merge_into_deduper`'s doc comment.
        let checksum_out = checksum.collect_results(&ctx);
        let permission_out = permission.collect_results(&ctx);
        assert!(checksum_out.is_empty());
        assert!(permission_out.is_empty());

        let expected_path = dir.path().join("f").to_string_lossy().to_string();
        let merged = deduper
            .get("package", "Extract", &expected_path)
            .expect("both analyzers converged on one shared record");
        let merged = merged.lock();
        assert!(merged.states[0].sha256.is_some());
        assert!(merged.states[0].permissions.is_some());
    }
}
