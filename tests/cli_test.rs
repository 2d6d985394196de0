//! CLI smoke tests: argument surface and store-backed commands end to end.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn chatwire(store: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chatwire").expect("binary builds");
    cmd.env("CHATWIRE_STORE_DIR", store.path());
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("chatwire")
        .expect("binary builds")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("logs"))
        .stdout(predicate::str::contains("auth"));
}

#[test]
fn test_history_list_empty_store() {
    let store = TempDir::new().expect("tempdir");
    chatwire(&store)
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved conversations"));
}

#[test]
fn test_logs_show_empty_store() {
    let store = TempDir::new().expect("tempdir");
    chatwire(&store)
        .args(["logs", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No logs yet"));
}

#[test]
fn test_settings_url_roundtrip() {
    let store = TempDir::new().expect("tempdir");

    chatwire(&store)
        .args(["settings", "set-url", "https://example.com/hook"])
        .assert()
        .success();

    chatwire(&store)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/hook"));
}

#[test]
fn test_settings_rejects_invalid_url() {
    let store = TempDir::new().expect("tempdir");
    chatwire(&store)
        .args(["settings", "set-url", "not a url"])
        .assert()
        .failure();
}

#[test]
fn test_auth_status_without_credentials() {
    let store = TempDir::new().expect("tempdir");
    chatwire(&store)
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No credentials configured"));
}

#[test]
fn test_logs_export_writes_file() {
    let store = TempDir::new().expect("tempdir");
    let out = store.path().join("export.txt");

    chatwire(&store)
        .args(["logs", "export", "--output"])
        .arg(&out)
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).expect("export file");
    assert!(text.contains("CHAT CONVERSATION LOGS"));
    assert!(text.contains("Total Entries: 0"));
}
