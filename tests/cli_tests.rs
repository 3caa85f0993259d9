//! CLI smoke tests.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn appshell() -> Command {
    Command::cargo_bin("appshell").unwrap()
}

#[test]
fn resolve_prints_the_asset_path() {
    appshell()
        .args(["resolve", "shell.app.demo.main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("modules/app/demo/main.json"));
}

#[test]
fn resolve_marks_prebundled_modules() {
    appshell()
        .args(["resolve", "shell.util.log", "--bundled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pre-bundled"));
}

#[test]
fn resolve_normalizes_case_and_whitespace() {
    appshell()
        .args(["resolve", " Shell.App.Demo.Main "])
        .assert()
        .success()
        .stdout(predicate::str::contains("modules/app/demo/main.json"));
}

#[test]
fn run_bootstraps_a_minimal_tree() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("modules/app/tiny/main.json");
    fs::create_dir_all(main.parent().unwrap()).unwrap();
    fs::write(
        &main,
        r#"{
            "defines": ["app.tiny"],
            "links": [{"child": "app.tiny", "parent": "app.base"}],
            "app": "app.tiny"
        }"#,
    )
    .unwrap();

    appshell()
        .args(["run", "tiny", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("application `tiny` started"));
}

#[test]
fn run_fails_when_the_root_module_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    appshell()
        .args(["run", "ghost", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("was not defined"));
}
