// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::path::PathBuf;

use pw_core::model::AnalysisDescriptor;
use pw_core::trigger::Trigger;
use tracing::{error, warn};

use crate::error::RunbookError;

/// Limit for a descriptor read, chosen to be much bigger than any analysis
/// descriptor we expect.
pub const DESCRIPTOR_SIZE_LIMIT: u64 = 1024 * 1024;

pub struct LoadedAnalysis {
    pub descriptor: AnalysisDescriptor,
    pub triggers: HashSet<Trigger>,
}

/// Triggers contained in a descriptor: the union of its descriptive
/// triggers and every diff pair's two members.
pub fn triggers_from_descriptor(descriptor: &AnalysisDescriptor) -> HashSet<Trigger> {
    let mut triggers = HashSet::new();
    for t in &descriptor.descriptive_triggers {
        triggers.insert(*t);
    }
    for pair in &descriptor.diff_pairs {
        triggers.insert(pair.before);
        triggers.insert(pair.after);
    }
    triggers
}

/// Load analyses from a filesystem: expand each glob pattern in `srcs`,
/// parse each matched file into an `AnalysisDescriptor` (skip directories
/// and malformed entries rather than failing the whole load).
pub fn load_analyses(srcs: &[String]) -> Result<Vec<LoadedAnalysis>, RunbookError> {
    let mut analyses = Vec::new();
    for src in srcs {
        let mut matched_any = false;
        for entry in glob::glob(src)? {
            matched_any = true;
            let path: PathBuf = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!(pattern = %src, error = %e, "glob entry error");
                    continue;
                }
            };
            if path.is_dir() {
                continue;
            }
            match load_one(&path) {
                Some(descriptor) => {
                    let triggers = triggers_from_descriptor(&descriptor);
                    analyses.push(LoadedAnalysis {
                        descriptor,
                        triggers,
                    });
                }
                None => error!(path = %path.display(), "failed to parse analysis descriptor"),
            }
        }
        if !matched_any {
            warn!(pattern = %src, "unable to get descriptor file names by globbing");
        }
    }
    Ok(analyses)
}

fn load_one(path: &std::path::Path) -> Option<AnalysisDescriptor> {
    let bytes = pw_wire::read_capped(path, DESCRIPTOR_SIZE_LIMIT).ok()??;
    let text = String::from_utf8_lossy(&bytes);
    match pw_wire::Encoding::from_path(path) {
        pw_wire::Encoding::Binary => serde_json::from_slice(&bytes).ok(),
        pw_wire::Encoding::Text => serde_json::from_str(&text).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::model::Argument;
    use pw_core::trigger::DiffPair;
    use tempfile::tempdir;

    fn write_descriptor(dir: &std::path::Path, name: &str, descriptor: &AnalysisDescriptor) {
        let path = dir.join(format!("{name}.txt"));
        pw_wire::write_message(&path, descriptor).expect("write descriptor");
    }

    fn descriptor_with(
        descriptive_triggers: Vec<Trigger>,
        diff_pairs: Vec<DiffPair>,
    ) -> AnalysisDescriptor {
        AnalysisDescriptor {
            name: "probe".into(),
            description: String::new(),
            category: String::new(),
            module: "probe".into(),
            arguments: Vec::new(),
            descriptive_triggers,
            diff_pairs,
            suite: None,
        }
    }

    #[yare::parameterized(
        empty = { vec![], vec![], 0 },
        descriptive_only = { vec![Trigger::Extract], vec![], 1 },
        diff_pair_only = { vec![], vec![DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair")], 2 },
        combined_with_overlap = {
            vec![Trigger::Extract],
            vec![DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair")],
            2
        },
    )]
    fn triggers_from_descriptor_unions_descriptive_and_diff_triggers(
        descriptive_triggers: Vec<Trigger>,
        diff_pairs: Vec<DiffPair>,
        expected_len: usize,
    ) {
        let descriptor = descriptor_with(descriptive_triggers, diff_pairs);
        assert_eq!(triggers_from_descriptor(&descriptor).len(), expected_len);
    }

    #[test]
    fn loads_descriptors_and_skips_directories() {
        let dir = tempdir().expect("tempdir");
        let descriptor = AnalysisDescriptor {
            name: "checksum".into(),
            description: String::new(),
            category: String::new(),
            module: "checksum".into(),
            arguments: vec![Argument::default()],
            descriptive_triggers: vec![Trigger::Extract],
            diff_pairs: vec![DiffPair::new(Trigger::Extract, Trigger::Install).expect("valid pair")],
            suite: None,
        };
        write_descriptor(dir.path(), "checksum", &descriptor);
        std::fs::create_dir(dir.path().join("subdir")).expect("mkdir");

        let pattern = dir.path().join("*").to_string_lossy().to_string();
        let loaded = load_analyses(&[pattern]).expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].descriptor.name, "checksum");
        assert!(loaded[0].triggers.contains(&Trigger::Extract));
        assert!(loaded[0].triggers.contains(&Trigger::Install));
    }

    #[test]
    fn malformed_descriptor_is_skipped_not_fatal() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bad.txt"), b"not a descriptor").expect("write");
        let pattern = dir.path().join("*").to_string_lossy().to_string();
        let loaded = load_analyses(&[pattern]).expect("load should not error");
        assert!(loaded.is_empty());
    }
}
