// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use pw_core::model::ApplicationResult;

use crate::error::QueueError;

/// Writes/reads `ApplicationResult` files under `out/`, named
/// `out/<name>-<ver>-<arch>.{txt,dat}`.
pub struct ResultWriter {
    out_dir: PathBuf,
    text_out: bool,
}

impl ResultWriter {
    pub fn new(out_dir: impl Into<PathBuf>, text_out: bool) -> Self {
        Self {
            out_dir: out_dir.into(),
            text_out,
        }
    }

    fn result_path(&self, basename: &str) -> PathBuf {
        let suffix = if self.text_out { "txt" } else { "dat" };
        self.out_dir.join(format!("{basename}.{suffix}"))
    }

    /// Write the final result. This must happen before the pending sentinel
    /// is released, so a crash between the two never loses a result that a
    /// concurrent reader could otherwise observe as claimed-but-resultless.
    pub fn write(&self, basename: &str, result: &ApplicationResult) -> Result<(), QueueError> {
        std::fs::create_dir_all(&self.out_dir)?;
        pw_wire::write_message(&self.result_path(basename), result)?;
        Ok(())
    }

    /// List every finalized result file under `out/`, for the Scorer
    /// (`result_directory_scorer` analog).
    pub fn list_results(&self) -> Result<Vec<PathBuf>, QueueError> {
        if !self.out_dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.out_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("txt") | Some("dat")
                )
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    pub fn read(path: &Path) -> Result<ApplicationResult, QueueError> {
        Ok(pw_wire::read_message(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::model::Package;
    use tempfile::tempdir;

    #[yare::parameterized(
        text_out = { true,  "txt" },
        binary_out = { false, "dat" },
    )]
    fn result_path_picks_extension_from_text_out(text_out: bool, expected_ext: &str) {
        let writer = ResultWriter::new("/tmp/unused", text_out);
        let path = writer.result_path("foo-1.0-amd64");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some(expected_ext));
    }

    #[test]
    fn writes_and_lists_result_files() {
        let dir = tempdir().expect("tempdir");
        let writer = ResultWriter::new(dir.path(), true);
        let result = ApplicationResult::new(Package::new_available("foo", "1.0", "amd64"));
        writer.write("foo-1.0-amd64", &result).expect("write");

        let listed = writer.list_results().expect("list");
        assert_eq!(listed.len(), 1);
        let back = ResultWriter::read(&listed[0]).expect("read");
        assert_eq!(back.package.name, "foo");
    }
}
