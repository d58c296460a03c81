//! `pw-broker` help output.

use crate::prelude::*;

#[test]
fn pw_broker_help_shows_flags() {
    pw_broker()
        .args(&["--help"])
        .passes()
        .stdout_has("--nfs")
        .stdout_has("--package")
        .stdout_has("--outdir");
}

#[test]
fn pw_broker_version_shows_version() {
    pw_broker().args(&["--version"]).passes().stdout_has("0.2");
}
