// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The structured-message data model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::trigger::Trigger;

/// `(name, version, architecture, section, description, status, error,
/// analysis_attempts, analysis_start, analysis_end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub architecture: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub description: String,
    pub status: PackageStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis_attempts: u32,
    #[serde(default)]
    pub analysis_start: Option<u64>,
    #[serde(default)]
    pub analysis_end: Option<u64>,
}

impl Package {
    pub fn new_available(name: &str, version: &str, architecture: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            architecture: architecture.to_string(),
            section: String::new(),
            description: String::new(),
            status: PackageStatus::Available,
            error: None,
            analysis_attempts: 0,
            analysis_start: None,
            analysis_end: None,
        }
    }

    pub fn basename(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.architecture)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    Available,
    Processing,
    Done,
    Failed,
}

/// `(name, description, category, module, arguments[], descriptive_triggers[],
/// diff_pairs[], suite)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub module: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub descriptive_triggers: Vec<Trigger>,
    #[serde(default)]
    pub diff_pairs: Vec<crate::trigger::DiffPair>,
    #[serde(default)]
    pub suite: Option<String>,
}

/// `(string_args[], prepend_extract_dir, recursive_file_walk, excluded_patterns[])`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub string_args: Vec<String>,
    #[serde(default)]
    pub prepend_extract_dir: bool,
    #[serde(default)]
    pub recursive_file_walk: bool,
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
}

/// One `(absolute_path, relative_path)` pair produced by argument preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreparedArgument {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Binary,
    Script,
    Text,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    Descriptive,
    Add,
    Delete,
    Change,
}

/// One `(trigger, permissions?, md5?, sha1?, sha256?, contents?)` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResultState {
    pub trigger: Trigger,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub contents: Option<Vec<u8>>,
}

impl FileResultState {
    pub fn at(trigger: Trigger) -> Self {
        Self {
            trigger,
            permissions: None,
            md5: None,
            sha1: None,
            sha256: None,
            contents: None,
        }
    }
}

/// `(path, type, file_type, states[])`. A descriptive result has exactly one
/// state; a diff result has exactly two, ordered `before, after`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub file_type: FileType,
    pub states: Vec<FileResultState>,
}

/// `(local_ip4/6, local_port, foreign_ip4/6, foreign_port, is_udp, process_path)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkResult {
    #[serde(default)]
    pub local_ip4: Option<String>,
    #[serde(default)]
    pub local_ip6: Option<String>,
    pub local_port: u16,
    #[serde(default)]
    pub foreign_ip4: Option<String>,
    #[serde(default)]
    pub foreign_ip6: Option<String>,
    pub foreign_port: u16,
    pub is_udp: bool,
    pub process_path: String,
}

/// A single entry within an [`AnalysisResult`]: one of three result
/// buckets, modeled as a sum type rather than three co-present optional
/// vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bucket")]
pub enum AnalysisResultEntry {
    FileSystem(FileResult),
    Package(FileResult),
    Network(NetworkResult),
}

/// `(analysis_name, results[])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_name: String,
    pub results: Vec<AnalysisResultEntry>,
}

impl AnalysisResult {
    pub fn new(analysis_name: impl Into<String>) -> Self {
        Self {
            analysis_name: analysis_name.into(),
            results: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// `(package, analysis_results[])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationResult {
    pub package: Package,
    pub analysis_results: Vec<AnalysisResult>,
}

impl ApplicationResult {
    pub fn new(package: Package) -> Self {
        Self {
            package,
            analysis_results: Vec::new(),
        }
    }

    /// Append an analysis result, discarding it if empty: an empty
    /// `AnalysisResult` never appears in the emitted `ApplicationResult`.
    pub fn add_analysis_result(&mut self, result: AnalysisResult) {
        if !result.is_empty() {
            self.analysis_results.push(result);
        }
    }
}
