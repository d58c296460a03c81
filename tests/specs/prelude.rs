//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolves a built binary's path, checking llvm-cov's target directory
/// first so coverage runs find the same binary a plain `cargo test` would.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn pw_binary() -> PathBuf {
    binary_path("pw")
}

fn pw_broker_binary() -> PathBuf {
    binary_path("pw-broker")
}

/// Builder for a `pw` invocation.
pub fn pw() -> CliBuilder {
    CliBuilder::new(pw_binary())
}

/// Builder for a `pw-broker` invocation.
pub fn pw_broker() -> CliBuilder {
    CliBuilder::new(pw_broker_binary())
}

pub struct CliBuilder {
    bin: PathBuf,
    args: Vec<String>,
    dir: Option<PathBuf>,
}

impl CliBuilder {
    fn new(bin: PathBuf) -> Self {
        Self {
            bin,
            args: Vec::new(),
            dir: None,
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(self.bin);
        cmd.args(&self.args);
        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }
}

/// A scratch directory of finalized `ApplicationResult` files, built without
/// depending on pw-core so this test crate stays a pure black-box consumer
/// of the wire format: text-encoded `.txt` files, plain pretty JSON
/// matching the `Package`/`ApplicationResult` field layout.
pub struct ResultDir {
    dir: tempfile::TempDir,
}

impl ResultDir {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a finalized `ApplicationResult` for a `DONE` package with a
    /// single file-system result at `result_path`.
    pub fn write_done_result(&self, basename: &str, name: &str, result_path: &str) {
        let value = serde_json::json!({
            "package": {
                "name": name,
                "version": "1.0",
                "architecture": "amd64",
                "section": "",
                "description": "",
                "status": "DONE",
                "error": null,
                "analysis_attempts": 1,
                "analysis_start": 0,
                "analysis_end": 1
            },
            "analysis_results": [
                {
                    "analysis_name": "permission_checker",
                    "results": [
                        {
                            "bucket": "FileSystem",
                            "path": result_path,
                            "type": "CHANGE",
                            "file_type": "TEXT",
                            "states": [
                                { "trigger": "install" }
                            ]
                        }
                    ]
                }
            ]
        });
        let path = self.dir.path().join(format!("{basename}.txt"));
        std::fs::write(path, serde_json::to_string_pretty(&value).expect("serialize")).expect("write fixture");
    }
}

/// A scratch score dictionary directory: one entry file per call.
pub struct DictionaryDir {
    dir: tempfile::TempDir,
}

impl DictionaryDir {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn glob_pattern(&self) -> String {
        self.dir.path().join("*").to_string_lossy().into_owned()
    }

    pub fn write_entry(&self, basename: &str, analysis_name: &str, path_regex: &str, score: i64) {
        let value = serde_json::json!({
            "analysis_name": analysis_name,
            "path_regex": path_regex,
            "result_type": "CHANGE",
            "result_name": null,
            "score": score
        });
        let path = self.dir.path().join(format!("{basename}.txt"));
        std::fs::write(path, serde_json::to_string_pretty(&value).expect("serialize")).expect("write fixture");
    }
}
