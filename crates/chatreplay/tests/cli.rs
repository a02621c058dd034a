//! Command-line failure paths that never reach the player

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn chatreplay() -> Command {
    let mut cmd = Command::cargo_bin("chatreplay").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_missing_chatlog_is_source_access_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.txt");

    chatreplay()
        .arg("--chatlog")
        .arg(&path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cannot read chat source"));
}

#[test]
fn test_malformed_transcript_aborts_startup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chat.txt");
    std::fs::write(&path, "01.01.2020 10:00:00 - alice: hi\ngarbage\n").unwrap();

    chatreplay()
        .arg("--chatlog")
        .arg(&path)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("transcript line 2"));
}

#[test]
fn test_unknown_extension_needs_format() {
    chatreplay()
        .args(["--chatlog", "chat.log"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--format"));
}

#[test]
fn test_json_error_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");

    chatreplay()
        .arg("--json")
        .arg("--chatlog")
        .arg(&path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("\"code\": \"source_access\""));
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("chatreplay.toml");
    std::fs::write(&config, "poll_interval_ms = \"fast\"").unwrap();

    chatreplay()
        .args(["--chatlog", "ondemand"])
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("TOML parse error"));
}

#[cfg(unix)]
#[test]
fn test_no_player_listening() {
    let dir = tempdir().unwrap();
    let chatlog = dir.path().join("chat.txt");
    std::fs::write(&chatlog, "01.01.2020 10:00:00 - alice: hi\n").unwrap();
    let socket = dir.path().join("mpv.sock");

    chatreplay()
        .arg("--chatlog")
        .arg(&chatlog)
        .arg("--pipename")
        .arg(&socket)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Player not running"));
}

#[test]
fn test_help_lists_options() {
    chatreplay()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--chatlog"))
        .stdout(predicate::str::contains("--pipename"));
}
