//! Integration tests for the `ferrywatch` CLI binary.
//!
//! Argument parsing, offline commands, config management, and one live
//! `watch` against a local WebSocket server.
#![allow(clippy::unwrap_used)]

use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tokio_tungstenite::tungstenite::{self, Message};

// ── Helpers ─────────────────────────────────────────────────────────

const MACHINE_EVENT: &str =
    r#"{"action":1,"resource":{"kind":"Machine","id":"vm-1","ownerId":"node-7"}}"#;

/// Build a [`Command`] for the `ferrywatch` binary with env isolation.
///
/// Clears all `FERRYWATCH_*` env vars and points the config file at
/// `config` so tests never touch the user's real configuration.
fn ferrywatch_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ferrywatch");
    cmd.env("HOME", "/tmp/ferrywatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/ferrywatch-cli-test-nonexistent")
        .env("FERRYWATCH_CONFIG", config)
        .env("NO_COLOR", "1")
        .env_remove("FERRYWATCH_PROFILE")
        .env_remove("FERRYWATCH_CONTROLLER")
        .env_remove("FERRYWATCH_OUTPUT")
        .env_remove("FERRYWATCH_TIMEOUT")
        .env_remove("FERRYWATCH_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .timeout(Duration::from_secs(30));
    cmd
}

fn temp_config() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

/// Accept one WebSocket client, send `frames`, hold the connection open.
fn serve(frames: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let Ok(mut ws) = tungstenite::accept(stream) else {
            return;
        };
        for frame in frames {
            if ws.send(Message::text(frame.to_owned())).is_err() {
                return;
            }
        }
        while ws.read().is_ok() {}
    });
    format!("http://{addr}")
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, config) = temp_config();
    let output = ferrywatch_cmd(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config).arg("--help").assert().success().stdout(
        predicate::str::contains("watch")
            .and(predicate::str::contains("keys"))
            .and(predicate::str::contains("scope"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ferrywatch"));
}

#[test]
fn test_completions_zsh() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── keys (offline) ──────────────────────────────────────────────────

#[test]
fn test_keys_standard_relations() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["keys", MACHINE_EVENT])
        .assert()
        .success()
        .stdout(predicate::eq("Machine\nMachine/vm-1\nNode/node-7\n"));
}

#[test]
fn test_keys_from_stdin_direct_only() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["keys", "--direct-only"])
        .write_stdin(format!("{MACHINE_EVENT}\n"))
        .assert()
        .success()
        .stdout(predicate::eq("Machine/vm-1\n"));
}

#[test]
fn test_keys_json_output() {
    let (_dir, config) = temp_config();
    let output = ferrywatch_cmd(&config)
        .args(["-o", "json-compact", "keys", MACHINE_EVENT])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["action"], "Updated");
    assert_eq!(rows[0]["kind"], "Machine");
    assert_eq!(rows[0]["keys"][2], "Node/node-7");
}

#[test]
fn test_keys_rejects_unknown_kind() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["keys", r#"{"action":1,"resource":{"kind":"Gadget","id":"g"}}"#])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Gadget"));
}

#[test]
fn test_keys_missing_relation_field_is_malformed() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["keys", r#"{"action":1,"resource":{"kind":"Machine","id":"vm-1"}}"#])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ownerId"));
}

#[test]
fn test_keys_uses_profile_relations() {
    let (_dir, config) = temp_config();
    std::fs::write(
        &config,
        r#"
[profiles.default]
controller = "http://10.0.0.5:8080"

[[profiles.default.relations.Instance]]
type = "related"
kind = "Cluster"
field = "/clusterId"
"#,
    )
    .unwrap();

    ferrywatch_cmd(&config)
        .args(["keys", r#"{"action":0,"resource":{"kind":"Instance","id":"i-1","clusterId":"c-9"}}"#])
        .assert()
        .success()
        .stdout(predicate::eq("Cluster/c-9\nInstance/i-1\n"));
}

// ── scope / relations ───────────────────────────────────────────────

#[test]
fn test_scope_defaults_to_everything() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["-c", "http://10.0.0.5:8080", "scope"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "ws://10.0.0.5:8080/v1/resources/events?action=3&kind=All\n",
        ));
}

#[test]
fn test_scope_with_filters() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args([
            "-c", "https://ctl.example", "scope", "--action", "deleted", "--kind", "Machine",
            "--owner", "Node/node-7",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "wss://ctl.example/v1/resources/events?action=2&kind=Machine&owner_kind=Node&owner_id=node-7",
        ));
}

#[test]
fn test_scope_without_controller_fails() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .arg("scope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No controller configured"));
}

#[test]
fn test_relations_lists_every_kind() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .arg("relations")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("related(Node, /ownerId)")
                .and(predicate::str::contains("StorageVolume"))
                .and(predicate::str::contains("Instance")),
        );
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_set_show() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["config", "init", "--url", "http://10.0.0.5:8080", "--name", "lab"])
        .assert()
        .success();
    ferrywatch_cmd(&config)
        .args(["config", "set", "kind", "Machine"])
        .assert()
        .success();

    ferrywatch_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("default_profile = \"lab\"")
                .and(predicate::str::contains("kind = \"Machine\"")),
        );

    ferrywatch_cmd(&config)
        .arg("scope")
        .assert()
        .success()
        .stdout(predicate::str::contains("kind=Machine"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["config", "init", "--url", "http://a"])
        .assert()
        .success();
    ferrywatch_cmd(&config)
        .args(["config", "init", "--url", "http://b"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_profile() {
    let (_dir, config) = temp_config();
    ferrywatch_cmd(&config)
        .args(["-p", "prod", "scope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("prod"));
}

// ── Live stream ─────────────────────────────────────────────────────

#[test]
fn test_check_unreachable_controller() {
    let (_dir, config) = temp_config();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    ferrywatch_cmd(&config)
        .args(["-c", &format!("http://{addr}"), "--timeout", "5", "check"])
        .assert()
        .code(7);
}

#[test]
fn test_check_reachable_controller() {
    let (_dir, config) = temp_config();
    let url = serve(Vec::new());
    ferrywatch_cmd(&config)
        .args(["-c", &url, "check"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok"));
}

#[test]
fn test_watch_prints_invalidated_keys() {
    let (_dir, config) = temp_config();
    let url = serve(vec![
        r#"{"action":"Frobnicate","resource":{"kind":"Machine","id":"vm-0"}}"#,
        MACHINE_EVENT,
    ]);

    ferrywatch_cmd(&config)
        .args(["-c", &url, "watch", "--count", "1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Machine/vm-1")
                .and(predicate::str::contains("Node/node-7"))
                .and(predicate::str::contains("vm-0").not()),
        );
}

#[test]
fn test_watch_gives_up_after_max_retries() {
    let (_dir, config) = temp_config();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    std::fs::write(
        &config,
        format!(
            "[profiles.default]\ncontroller = \"http://{addr}\"\nreconnect_initial_ms = 10\nreconnect_max_ms = 20\n"
        ),
    )
    .unwrap();

    ferrywatch_cmd(&config)
        .args(["watch", "--max-retries", "1"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Gave up reconnecting"));
}
