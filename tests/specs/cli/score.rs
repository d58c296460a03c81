//! `pw score`: score a directory of finalized `ApplicationResult` files
//! against a file-system dictionary and write `DetailedPackageScore` files.

use crate::prelude::*;

#[test]
fn scores_a_result_directory_against_a_dictionary() {
    let results = ResultDir::empty();
    results.write_done_result("emacspeak-1.12.1-i386", "emacspeak", "/etc/passwd");

    let dict = DictionaryDir::empty();
    dict.write_entry("perm", "permission_checker", "^/etc/passwd$", 10);

    let score_dir = tempfile::tempdir().expect("tempdir");

    pw()
        .args(&["score"])
        .args(&["--resultdir", results.path().to_str().expect("utf8 path")])
        .args(&["--scoredir", score_dir.path().to_str().expect("utf8 path")])
        .args(&["--textout"])
        .args(&["--filedict", &dict.glob_pattern()])
        .args(&["--packagedict", &dict.glob_pattern()])
        .passes();

    let written = score_dir.path().join("emacspeak-1.12.1-i386.txt");
    let contents = std::fs::read_to_string(&written).expect("score file written");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("valid json");
    assert_eq!(value["package"]["name"], "emacspeak");
    assert_eq!(value["package_score"], 10);
    assert_eq!(value["overall_result_scores"][0]["analysis_name"], "permission_checker");
}

#[test]
fn scoring_an_empty_result_directory_is_a_no_op() {
    let results = ResultDir::empty();
    let score_dir = tempfile::tempdir().expect("tempdir");

    pw()
        .args(&["score"])
        .args(&["--resultdir", results.path().to_str().expect("utf8 path")])
        .args(&["--scoredir", score_dir.path().to_str().expect("utf8 path")])
        .passes();

    let entries: Vec<_> = std::fs::read_dir(score_dir.path())
        .expect("read score dir")
        .collect();
    assert!(entries.is_empty());
}
