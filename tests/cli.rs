use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

/// The binary, isolated from the host: the working directory, home and data
/// directories all live in `dir`, and no `SCORTON_*` variable leaks in.
fn scorton(dir: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scorton");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_DATA_HOME", dir.join("data"))
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars().filter(|(k, _)| k.starts_with("SCORTON_")) {
        cmd.env_remove(key);
    }
    cmd
}

fn results(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.join("scorton-results"))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn config_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("apiEndpoint: http://localhost:8000"))
        .stdout(predicate::str::contains("complianceMode: both"))
        .stdout(predicate::str::contains("authToken").not());
}

#[test]
fn config_masks_the_token() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .arg("config")
        .env("SCORTON_TOKEN", "supersecret")
        .assert()
        .success()
        .stdout(predicate::str::contains("authToken: ***"))
        .stdout(predicate::str::contains("supersecret").not());
}

#[test]
fn config_set_persists_into_the_project_file() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .args(["config", "--set", "fastBackendPort=4000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fastBackendPort: 4000"));

    let saved = std::fs::read_to_string(dir.path().join(".scorton/config.json")).unwrap();
    assert!(saved.contains("\"fastBackendPort\": 4000"));
}

#[test]
fn config_set_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .args(["config", "--set", "color=red"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn config_set_requires_an_assignment() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path()).args(["config", "--set", "apiEndpoint"]).assert().code(2);
}

#[test]
fn malformed_project_config_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".scorton")).unwrap();
    std::fs::write(dir.path().join(".scorton/config.json"), "{not json").unwrap();
    scorton(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("apiEndpoint: http://localhost:8000"));
}

#[test]
fn home_config_is_overridden_by_the_project() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".scorton")).unwrap();
    let project = dir.path().join("project");
    std::fs::create_dir_all(project.join(".scorton")).unwrap();
    std::fs::write(dir.path().join(".scorton/config.json"), r#"{"apiEndpoint": "http://home"}"#).unwrap();
    std::fs::write(project.join(".scorton/config.json"), r#"{"apiEndpoint": "http://project"}"#).unwrap();

    scorton(dir.path())
        .current_dir(&project)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("apiEndpoint: http://project"));
}

#[test]
fn init_writes_the_template_tag() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .args(["init", "--template", "fintech"])
        .assert()
        .success()
        .stdout(predicate::str::contains("template: fintech"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(".scorton/config.json")).unwrap()).unwrap();
    assert_eq!(saved["template"], "fintech");
    assert_eq!(saved["apiEndpoint"], "http://localhost:8000");
}

#[test]
fn scan_with_both_backends_disabled_records_an_error() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .args(["scan", "whois_scan", "https://Example.com!!"])
        .env("SCORTON_USE_FAST_BACKEND", "false")
        .env("SCORTON_FALLBACK_ENABLED", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"error\""))
        .stdout(predicate::str::contains("fallback disabled"));

    let files = results(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("scan-https-example-com-"));
    assert!(files[0].ends_with(".json"));
}

#[test]
fn score_failure_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .args(["score", "example.com"])
        .env("SCORTON_USE_FAST_BACKEND", "0")
        .env("SCORTON_FALLBACK_ENABLED", "no")
        .assert()
        .success()
        .stdout(predicate::str::contains("native engine disabled").not())
        .stdout(predicate::str::contains("fallback disabled"));
    assert_eq!(results(dir.path()).len(), 1);
}

#[test]
fn compliance_both_writes_five_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .args(["compliance", "both", "example.com"])
        .env("SCORTON_FALLBACK_ENABLED", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dora\""))
        .stdout(predicate::str::contains("\"nis2\""));

    let files = results(dir.path());
    assert_eq!(files.len(), 5);
    assert_eq!(files.iter().filter(|f| f.starts_with("compliance-combined-")).count(), 1);
    assert_eq!(files.iter().filter(|f| f.ends_with(".md")).count(), 2);
}

#[test]
fn unknown_compliance_framework_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path()).args(["compliance", "sox", "example.com"]).assert().code(2);
    assert!(results(dir.path()).is_empty());
}

#[test]
fn unknown_tool_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path()).args(["scan", "nmap", "example.com"]).assert().code(2);
}

#[test]
fn tools_lists_the_serving_backends() {
    let dir = tempfile::tempdir().unwrap();
    scorton(dir.path())
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ssl_scan       native, legacy"))
        .stdout(predicate::str::contains("xss_scan       legacy"));
}
