//! `pw-broker` refuses to start without either a usable NFS config or an
//! explicit `--package` name.

use crate::prelude::*;

#[test]
fn neither_nfs_config_nor_package_name_fails_clearly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing_config = dir.path().join("analysis.config");
    let log_dir = dir.path().join("log");

    pw_broker()
        .args(&["--nfs", missing_config.to_str().expect("utf8 path")])
        .args(&["--logdir", log_dir.to_str().expect("utf8 path")])
        .fails()
        .stderr_has("no package for analysis");
}
