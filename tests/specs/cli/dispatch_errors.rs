//! `pw dispatch` argument and batch-file error paths that don't require a
//! real VM image or hypervisor.

use crate::prelude::*;

#[test]
fn dispatch_without_required_flags_fails() {
    pw().args(&["dispatch"]).fails().stderr_has("Usage:");
}

#[test]
fn dispatch_with_missing_batchfile_fails_with_readable_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.txt");
    let nfs = dir.path().join("nfs");

    pw()
        .args(&[
            "dispatch",
            "--image",
            "unused.img",
            "--memory",
            "4096",
            "--timeout",
            "120",
            "--batchfile",
        ])
        .args(&[missing.to_str().expect("utf8 path")])
        .args(&["--nfshost", nfs.to_str().expect("utf8 path")])
        .args(&["--nfsguest", "/mnt/broker"])
        .fails()
        .stderr_has("Error:");
}
