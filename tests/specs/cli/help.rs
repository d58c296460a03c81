//! `pw` help and version output.

use crate::prelude::*;

#[test]
fn pw_help_shows_usage() {
    pw().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn pw_version_shows_version() {
    pw().args(&["--version"]).passes().stdout_has("0.2");
}

#[test]
fn pw_dispatch_help_shows_flags() {
    pw()
        .args(&["dispatch", "--help"])
        .passes()
        .stdout_has("--image")
        .stdout_has("--batchfile")
        .stdout_has("--nfshost");
}

#[test]
fn pw_score_help_shows_flags() {
    pw()
        .args(&["score", "--help"])
        .passes()
        .stdout_has("--resultdir")
        .stdout_has("--scoredir");
}

#[test]
fn pw_no_args_fails_with_usage() {
    pw().fails().stderr_has("Usage:");
}
