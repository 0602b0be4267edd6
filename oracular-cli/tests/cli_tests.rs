//! Command-line behavior of the oracular binary

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn oracular(cwd: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("oracular");
    cmd.current_dir(cwd).env_remove("RUST_LOG");
    cmd
}

fn explicit_inputs(cmd: &mut assert_cmd::Command, name: &str) {
    let dir = fixture_path(name);
    for (flag, file) in [
        ("--insens-weights", "insens_weights.facts"),
        ("--sens-weights", "sens_weights.facts"),
        ("--insens-costs", "insens_costs.facts"),
        ("--sens-costs", "sens_costs.facts"),
    ] {
        cmd.arg(flag).arg(dir.join(file));
    }
}

fn import(cwd: &Path, run: &str) {
    oracular(cwd)
        .args(["import", "--run", run, "--cache-dir", "cache", "--from"])
        .arg(fixture_path("database").join(run))
        .assert()
        .success();
}

#[test]
fn test_classify_explicit_inputs() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("sensitivity.facts");

    let mut cmd = oracular(tmp.path());
    cmd.arg("classify");
    explicit_inputs(&mut cmd, "scenario");
    cmd.args(["--slowdown", "3"]).arg("--output").arg(&output);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Selected threshold: 0.2"))
        .stdout(predicate::str::contains("missing precision data: 1"));

    let expected = fs::read_to_string(fixture_path("scenario").join("expected-S3.facts")).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), expected);
}

#[test]
fn test_classify_json_summary() {
    let tmp = TempDir::new().unwrap();

    let mut cmd = oracular(tmp.path());
    cmd.arg("classify");
    explicit_inputs(&mut cmd, "deps");
    cmd.arg("--deps")
        .arg(fixture_path("deps").join("requires.facts"))
        .args(["--slowdown", "1.25", "--propagation", "transitive"])
        .args(["--format", "json", "--out-dir", "out"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"threshold\": 0.1"))
        .stdout(predicate::str::contains("\"propagation\": \"transitive\""))
        .stdout(predicate::str::contains("\"search_cost\": 50"))
        .stdout(predicate::str::contains("\"predicted_cost\": 70"));

    let written = tmp.path().join("out").join("temp-MethodSensitivity-S1.25.facts");
    assert_eq!(
        fs::read_to_string(written).unwrap(),
        "main\t2-object\nhelper\t2-object\nleaf\t2-object\nutil\tcontext-insensitive\n"
    );
}

#[test]
fn test_partial_explicit_inputs_rejected() {
    let tmp = TempDir::new().unwrap();
    oracular(tmp.path())
        .arg("classify")
        .arg("--insens-weights")
        .arg(fixture_path("scenario").join("insens_weights.facts"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be given together"));
}

#[test]
fn test_deps_optional_without_deps_rejected() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.facts");

    let mut cmd = oracular(tmp.path());
    cmd.arg("classify");
    explicit_inputs(&mut cmd, "deps");
    cmd.args(["--slowdown", "1.25", "--deps-optional"])
        .arg("--output")
        .arg(&output);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--deps-optional requires --deps"));
    assert!(!output.exists());
}

#[test]
fn test_non_positive_slowdown_rejected() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.facts");

    let mut cmd = oracular(tmp.path());
    cmd.arg("classify");
    explicit_inputs(&mut cmd, "scenario");
    cmd.args(["--slowdown", "0"]).arg("--output").arg(&output);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("target_slowdown must be positive"));
    assert!(!output.exists());
}

#[test]
fn test_malformed_facts_fail_without_output() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.facts");

    let scenario = fixture_path("scenario");
    let mut cmd = oracular(tmp.path());
    cmd.arg("classify")
        .arg("--insens-weights")
        .arg(fixture_path("malformed").join("insens_weights.facts"))
        .arg("--sens-weights")
        .arg(scenario.join("sens_weights.facts"))
        .arg("--insens-costs")
        .arg(scenario.join("insens_costs.facts"))
        .arg("--sens-costs")
        .arg(scenario.join("sens_costs.facts"))
        .arg("--output")
        .arg(&output);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("malformed fact"));
    assert!(!output.exists());
}

#[test]
fn test_import_then_classify_from_cache() {
    let tmp = TempDir::new().unwrap();

    oracular(tmp.path())
        .args(["classify", "--cache-dir", "cache", "--slowdown", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("import the run first"));

    import(tmp.path(), "insensitive");
    import(tmp.path(), "sensitive");

    oracular(tmp.path())
        .args(["import", "--run", "sensitive", "--cache-dir", "cache", "--from"])
        .arg(fixture_path("database").join("sensitive"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Using cached 2-object-sensitive+heap facts"));

    oracular(tmp.path())
        .args(["classify", "--cache-dir", "cache", "--out-dir", "out", "--slowdown", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("temp-MethodSensitivity-S3.facts"));

    let output = tmp.path().join("out").join("temp-MethodSensitivity-S3.facts");
    assert_eq!(
        fs::read_to_string(output).unwrap(),
        "B\t2-object\nA\t2-object\nC\tcontext-insensitive\n"
    );
}

#[test]
fn test_import_missing_export_fails() {
    let tmp = TempDir::new().unwrap();
    oracular(tmp.path())
        .args(["import", "--run", "insensitive", "--with-deps", "--cache-dir", "cache"])
        .arg("--from")
        .arg(fixture_path("database").join("insensitive"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("MethodRequires.csv"));
}

#[test]
fn test_ratios_listing_is_sorted() {
    let tmp = TempDir::new().unwrap();

    let mut cmd = oracular(tmp.path());
    cmd.arg("ratios");
    explicit_inputs(&mut cmd, "deps");
    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let methods: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(methods, vec!["main", "util", "helper", "leaf"]);

    let mut cmd = oracular(tmp.path());
    cmd.arg("ratios");
    explicit_inputs(&mut cmd, "deps");
    cmd.args(["--top", "1", "--format", "json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"method\": \"main\""))
        .stdout(predicate::str::contains("util").not());
}

#[test]
fn test_config_file_sets_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".oracularrc.json"),
        r#"{"target_slowdown": 1.25, "propagation": "none", "out_dir": "results"}"#,
    )
    .unwrap();

    let mut cmd = oracular(tmp.path());
    cmd.arg("classify");
    explicit_inputs(&mut cmd, "deps");
    cmd.arg("--deps").arg(fixture_path("deps").join("requires.facts"));

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Using config:"))
        .stdout(predicate::str::contains("propagated (none): 0"));

    assert!(tmp
        .path()
        .join("results")
        .join("temp-MethodSensitivity-S1.25.facts")
        .is_file());
}

#[test]
fn test_config_validate() {
    let tmp = TempDir::new().unwrap();

    oracular(tmp.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config file found"));

    fs::write(tmp.path().join("oracular.config.json"), r#"{"app": "antlr"}"#).unwrap();
    oracular(tmp.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config valid"));

    fs::write(tmp.path().join("bad.json"), r#"{"target_slowdown": -1}"#).unwrap();
    oracular(tmp.path())
        .args(["config", "validate", "--path", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config validation failed"));
}

#[test]
fn test_config_show() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".oracularrc.json"),
        r#"{"propagation": "transitive", "force_sensitive": ["<java.util.*"]}"#,
    )
    .unwrap();

    oracular(tmp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("propagation: transitive"))
        .stdout(predicate::str::contains("force_sensitive: 1 pattern(s)"))
        .stdout(predicate::str::contains("app: temp"));
}
