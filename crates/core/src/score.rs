// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoring data model.

use serde::{Deserialize, Serialize};

use crate::model::{Package, ResultKind};

/// `(analysis_name, path_regex?, result_type?, result_name?, score)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResultScoreDictionaryEntry {
    pub analysis_name: String,
    #[serde(default)]
    pub path_regex: Option<String>,
    #[serde(default)]
    pub result_type: Option<ResultKind>,
    #[serde(default)]
    pub result_name: Option<String>,
    pub score: i64,
}

/// One scored hit against a particular path, carried in
/// [`PackageLevelFileScore::scores`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultScore {
    pub result_name: String,
    pub score: i64,
}

/// Per-path aggregation: `overall_score` is the sum of every matching
/// [`ResultScore`] for that path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageLevelFileScore {
    pub path: String,
    pub overall_score: i64,
    pub scores: Vec<ResultScore>,
}

impl PackageLevelFileScore {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            overall_score: 0,
            scores: Vec::new(),
        }
    }

    pub fn add(&mut self, result_name: impl Into<String>, score: i64) {
        self.overall_score += score;
        self.scores.push(ResultScore {
            result_name: result_name.into(),
            score,
        });
    }
}

/// Per-analysis-name rollup, keyed by analysis name in
/// [`DetailedPackageScore::overall_result_scores`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisScore {
    pub analysis_name: String,
    pub score: i64,
}

/// `(package, file_result_scores[], overall_result_scores[], package_score)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedPackageScore {
    pub package: Package,
    pub file_result_scores: Vec<PackageLevelFileScore>,
    pub overall_result_scores: Vec<AnalysisScore>,
    pub package_score: i64,
}

impl DetailedPackageScore {
    /// `package_score = Σ overall_result_scores[*].score`.
    pub fn recompute_package_score(&mut self) {
        self.package_score = self.overall_result_scores.iter().map(|a| a.score).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageStatus;

    #[test]
    fn package_score_is_sum_of_analysis_scores() {
        let mut dps = DetailedPackageScore {
            package: Package {
                name: "foo".into(),
                version: "1".into(),
                architecture: "amd64".into(),
                section: String::new(),
                description: String::new(),
                status: PackageStatus::Done,
                error: None,
                analysis_attempts: 1,
                analysis_start: Some(0),
                analysis_end: Some(1),
            },
            file_result_scores: vec![],
            overall_result_scores: vec![
                AnalysisScore {
                    analysis_name: "permission_checker".into(),
                    score: 5,
                },
                AnalysisScore {
                    analysis_name: "checksum_checker".into(),
                    score: 3,
                },
            ],
            package_score: 0,
        };
        dps.recompute_package_score();
        assert_eq!(dps.package_score, 8);
    }
}
