// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument preprocessing: expanding an `Argument` into the concrete
//! `(absolute_path, relative_path)` pairs an analyzer walks.

use std::path::{Path, PathBuf};

use pw_core::model::{Argument, PreparedArgument};
use regex::Regex;

/// Convert an `Argument` into the list of `(absolute_path, relative_path)`
/// pairs analyzers consume.
pub fn preprocess_argument(argument: &Argument, extract_dir: &Path) -> Vec<PreparedArgument> {
    let prefix: PathBuf = if argument.prepend_extract_dir {
        extract_dir.to_path_buf()
    } else {
        PathBuf::new()
    };

    // Mirrors `re.compile('|'.join(excluded_patterns)).match(rel_path)`: one
    // alternation anchored at the start of the string, not a search anywhere
    // within it.
    let excluded = if argument.excluded_patterns.is_empty() {
        None
    } else {
        Regex::new(&argument.excluded_patterns.join("|")).ok()
    };

    let mut out = Vec::new();
    for raw in &argument.string_args {
        let complete = prefix.join(raw);
        let Some(complete_str) = complete.to_str() else {
            continue;
        };
        let expansions: Vec<PathBuf> = glob::glob(complete_str)
            .map(|g| g.filter_map(|e| e.ok()).collect())
            .unwrap_or_default();

        for expanded in expansions {
            if argument.recursive_file_walk {
                for entry in walkdir::WalkDir::new(&expanded)
                    .into_iter()
                    .filter_map(|e| e.ok())
                {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let file_path = entry.path().to_path_buf();
                    let relative_path = if argument.prepend_extract_dir {
                        file_path
                            .strip_prefix(&prefix)
                            .unwrap_or(&file_path)
                            .to_path_buf()
                    } else {
                        file_path.clone()
                    };
                    if let Some(re) = &excluded {
                        let rel = relative_path.to_string_lossy();
                        if matches!(re.find(&rel), Some(m) if m.start() == 0) {
                            continue;
                        }
                    }
                    out.push(PreparedArgument {
                        absolute_path: file_path,
                        relative_path,
                    });
                }
            } else {
                out.push(PreparedArgument {
                    absolute_path: expanded.clone(),
                    relative_path: expanded,
                });
            }
        }
    }
    out
}
