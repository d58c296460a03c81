// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host-side Scorer: matches file results against a regex-keyed
//! dictionary, sums per-file scores into a per-package score, and folds
//! per-package scores into a directory-wide total.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use pw_core::model::{AnalysisResultEntry, ApplicationResult, FileResult, PackageStatus, ResultKind};
use pw_core::score::{AnalysisScore, DetailedPackageScore, FileResultScoreDictionaryEntry, PackageLevelFileScore, ResultScore};
use pw_queue::ResultWriter;
use tracing::error;

use crate::error::EngineError;

/// Limit for one dictionary-entry file, mirrors
/// `descriptor_loader::DESCRIPTOR_SIZE_LIMIT`'s rationale.
const DICTIONARY_ENTRY_SIZE_LIMIT: u64 = 1024 * 1024;

struct CompiledEntry {
    entry: FileResultScoreDictionaryEntry,
    path_regex: Option<regex::Regex>,
}

impl CompiledEntry {
    /// `FileResultDictionaryMatcher.Match`: path regex is a `re.match`
    /// (anchored at the start, not required to consume the whole string),
    /// result_type must agree when the entry names one.
    fn matches(&self, result: &FileResult) -> bool {
        if let Some(re) = &self.path_regex {
            match re.find(&result.path) {
                Some(m) if m.start() == 0 => {}
                _ => return false,
            }
        }
        if let Some(result_type) = self.entry.result_type {
            if result_type != result.kind {
                return false;
            }
        }
        true
    }

    fn score(&self) -> ResultScore {
        let result_name = self
            .entry
            .result_name
            .clone()
            .unwrap_or_else(|| self.entry.analysis_name.clone());
        ResultScore {
            result_name,
            score: self.entry.score,
        }
    }
}

/// Scores file results against one loaded dictionary, keyed by analysis name
/// for a cheap first filter before the per-entry match.
pub struct FileResultScorer {
    dictionary: HashMap<String, Vec<CompiledEntry>>,
}

impl FileResultScorer {
    pub fn load(srcs: &[String]) -> Result<Self, EngineError> {
        let mut dictionary: HashMap<String, Vec<CompiledEntry>> = HashMap::new();
        for src in srcs {
            for entry in glob::glob(src).map_err(|e| EngineError::Fatal(format!("bad dictionary pattern {src}: {e}")))? {
                let path = match entry {
                    Ok(p) => p,
                    Err(e) => {
                        error!(pattern = %src, error = %e, "glob entry error loading score dictionary");
                        continue;
                    }
                };
                if path.is_dir() {
                    continue;
                }
                match load_one(&path) {
                    Some(entry) if !entry.analysis_name.is_empty() => {
                        let compiled = CompiledEntry {
                            path_regex: entry
                                .path_regex
                                .as_deref()
                                .map(regex::Regex::new)
                                .transpose()
                                .map_err(|e| EngineError::Fatal(format!("bad path_regex in {}: {e}", path.display())))?,
                            entry,
                        };
                        dictionary.entry(compiled.entry.analysis_name.clone()).or_default().push(compiled);
                    }
                    Some(_) => {}
                    None => error!(path = %path.display(), "could not parse dictionary entry file"),
                }
            }
        }
        Ok(Self { dictionary })
    }

    /// First-match-wins scan of this analysis name's matchers.
    pub fn score(&self, analysis_name: &str, result: &FileResult) -> Option<ResultScore> {
        let matchers = self.dictionary.get(analysis_name)?;
        matchers.iter().find(|m| m.matches(result)).map(CompiledEntry::score)
    }
}

fn load_one(path: &Path) -> Option<FileResultScoreDictionaryEntry> {
    let bytes = pw_wire::read_capped(path, DICTIONARY_ENTRY_SIZE_LIMIT).ok()??;
    let text = String::from_utf8_lossy(&bytes);
    match pw_wire::Encoding::from_path(path) {
        pw_wire::Encoding::Binary => serde_json::from_slice(&bytes).ok(),
        pw_wire::Encoding::Text => serde_json::from_str(&text).ok(),
    }
}

/// Scores one finished package's `ApplicationResult` against the file-system
/// and package-scope dictionaries.
pub struct ApplicationScorer {
    file_system_scorer: FileResultScorer,
    package_scorer: FileResultScorer,
}

impl ApplicationScorer {
    pub fn new(file_system_dictionary_srcs: &[String], package_dictionary_srcs: &[String]) -> Result<Self, EngineError> {
        Ok(Self {
            file_system_scorer: FileResultScorer::load(file_system_dictionary_srcs)?,
            package_scorer: FileResultScorer::load(package_dictionary_srcs)?,
        })
    }

    /// `ApplicationScorer.Score`: refuse anything but a `DONE` package, then
    /// scan every result, aggregating per-path and per-analysis-name.
    pub fn score(&self, application_result: &ApplicationResult) -> Result<DetailedPackageScore, EngineError> {
        if application_result.package.status != PackageStatus::Done {
            return Err(EngineError::Fatal(format!(
                "no result for package {}: status {:?}",
                application_result.package.basename(),
                application_result.package.status
            )));
        }

        let mut file_scores: IndexMap<String, PackageLevelFileScore> = IndexMap::new();
        let mut analysis_scores: IndexMap<String, i64> = IndexMap::new();

        for analysis_result in &application_result.analysis_results {
            let analysis_name = &analysis_result.analysis_name;
            for entry in &analysis_result.results {
                let (scorer, file_result) = match entry {
                    AnalysisResultEntry::Package(fr) => (&self.package_scorer, fr),
                    AnalysisResultEntry::FileSystem(fr) => (&self.file_system_scorer, fr),
                    AnalysisResultEntry::Network(_) => continue,
                };
                if let Some(score) = scorer.score(analysis_name, file_result) {
                    file_scores
                        .entry(file_result.path.clone())
                        .or_insert_with(|| PackageLevelFileScore::new(file_result.path.clone()))
                        .add(score.result_name, score.score);
                    *analysis_scores.entry(analysis_name.clone()).or_insert(0) += score.score;
                }
            }
        }

        let mut detailed = DetailedPackageScore {
            package: application_result.package.clone(),
            file_result_scores: file_scores.into_values().collect(),
            overall_result_scores: analysis_scores
                .into_iter()
                .map(|(analysis_name, score)| AnalysisScore { analysis_name, score })
                .collect(),
            package_score: 0,
        };
        detailed.recompute_package_score();
        Ok(detailed)
    }
}

/// `ScoreResultDirectory`: score every finalized result under `result_dir`,
/// writing one `DetailedPackageScore` per input file into `score_dir`.
/// Per-package scoring failure (bad status, malformed file) is logged and
/// skipped rather than aborting the batch.
pub fn score_result_directory(
    scorer: &ApplicationScorer,
    result_dir: &Path,
    score_dir: &Path,
    text_out: bool,
) -> Result<(), EngineError> {
    let reader = ResultWriter::new(result_dir, text_out);
    let writer = ResultWriter::new(score_dir, text_out);
    std::fs::create_dir_all(score_dir)?;

    for path in reader.list_results()? {
        let application_result = match ResultWriter::read(&path) {
            Ok(r) => r,
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not parse application result");
                continue;
            }
        };
        match scorer.score(&application_result) {
            Ok(score) => {
                let basename = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                write_score(&writer, &basename, &score, score_dir, text_out)?;
            }
            Err(e) => error!(path = %path.display(), error = %e, "could not score package"),
        }
    }
    Ok(())
}

fn write_score(
    _writer: &ResultWriter,
    basename: &str,
    score: &DetailedPackageScore,
    score_dir: &Path,
    text_out: bool,
) -> Result<(), EngineError> {
    let suffix = if text_out { "txt" } else { "dat" };
    let path: PathBuf = score_dir.join(format!("{basename}.{suffix}"));
    pw_wire::write_message(&path, score)?;
    Ok(())
}
