//! CLI surface checks.

use assert_cmd::Command;
use predicates::prelude::*;

fn ht(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ht-core").expect("binary");
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

#[test]
fn classify_reports_the_firing_rule() {
    let dir = tempfile::tempdir().expect("tempdir");

    ht(dir.path())
        .args(["classify", "--name", "Authorization", "--value", "x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sensitive_name"));

    ht(dir.path())
        .args(["classify", "--name", "Content-Type", "--value", "text/html"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""redact": false"#));
}

#[test]
fn config_roundtrip_and_validation() {
    let dir = tempfile::tempdir().expect("tempdir");

    ht(dir.path())
        .args(["config", "set-endpoint", "http://localhost:3000/plugin"])
        .assert()
        .success();

    ht(dir.path())
        .args(["config", "set-frequency", "7"])
        .assert()
        .success();

    ht(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:3000/plugin"))
        .stdout(predicate::str::contains("7"));

    // A zero interval is invalid usage.
    ht(dir.path())
        .args(["config", "set-frequency", "0"])
        .assert()
        .code(10);

    ht(dir.path())
        .args(["config", "set-endpoint", "not a url"])
        .assert()
        .code(10);
}

#[test]
fn status_on_a_fresh_store_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");

    ht(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""totalEntries": 0"#));
}

#[test]
fn run_ingests_stdin_and_persists_on_exit() {
    let dir = tempfile::tempdir().expect("tempdir");

    let observations = concat!(
        r#"{"type":"request","name":"Accept","value":"*/*"}"#,
        "\n",
        r#"{"type":"request","name":"Accept","value":"*/*"}"#,
        "\n",
        r#"{"type":"request","name":"Cookie","value":"session=abc"}"#,
        "\n",
    );

    ht(dir.path())
        .arg("run")
        .write_stdin(observations)
        .assert()
        .success();

    ht(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""totalEntries": 2"#))
        .stdout(predicate::str::contains("(anonymized)"));
}

#[test]
fn clear_resets_the_persisted_table() {
    let dir = tempfile::tempdir().expect("tempdir");

    ht(dir.path())
        .arg("run")
        .write_stdin(r#"{"type":"response","name":"Server","value":"nginx"}"#)
        .assert()
        .success();

    ht(dir.path()).arg("clear").assert().success();

    ht(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""totalEntries": 0"#));
}
