// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests that run the `roomsync` binary.
//!
//! Each test writes its own config file and, where needed, starts a local
//! mock HTTP server for the history endpoint.

use std::io::Write;
use std::process::Output;

use tempfile::NamedTempFile;
use tokio::process::Command;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

async fn roomsync(config: &NamedTempFile, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_roomsync"))
        .arg("--plain")
        .arg("--config")
        .arg(config.path())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("ROOMSYNC_SERVER_TOKEN")
        .env_remove("ROOMSYNC_SERVER_API_URL")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn config_check_accepts_valid_file() {
    let config = config_file(
        r#"
[server]
ws_url = "ws://chat.example/ws"
token = "secret"

[reconnect]
max_attempts = 3
"#,
    );
    let output = roomsync(&config, &["config", "check"]).await;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("configuration is valid"));
    assert!(stdout.contains("ws://chat.example/ws"));
    assert!(stdout.contains("max_attempts: 3"));
    assert!(!stdout.contains("secret"));
}

#[tokio::test]
async fn config_check_reports_unknown_key() {
    let config = config_file("[server]\ntokn = \"x\"\n");
    let output = roomsync(&config, &["config", "check"]).await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("tokn"));
}

#[tokio::test]
async fn history_prints_merged_sequence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/room-1/messages"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 2, "conversation_id": "room-1", "sender": "u2", "content": "second", "timestamp": 20},
            {"id": 1, "conversation_id": "room-1", "sender": "u1", "content": "first", "timestamp": 10},
            {"id": 1, "conversation_id": "room-1", "sender": "u1", "content": "first", "timestamp": 10}
        ])))
        .mount(&server)
        .await;

    let config = config_file(&format!(
        "[server]\napi_url = \"{}/api\"\ntoken = \"secret\"\n",
        server.uri()
    ));

    let output = roomsync(&config, &["history", "room-1", "--json"]).await;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let messages: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let contents: Vec<&str> = messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["first", "second"]);

    let output = roomsync(&config, &["history", "room-1", "--alias", "u2=Bob"]).await;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("u1: first"));
    assert!(lines[1].ends_with("Bob: second"));
}

#[tokio::test]
async fn history_without_token_fails() {
    let config = config_file("[server]\napi_url = \"http://127.0.0.1:9/api\"\n");
    let output = roomsync(&config, &["history", "room-1"]).await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no credential available"));
}

#[tokio::test]
async fn history_reports_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let config = config_file(&format!(
        "[server]\napi_url = \"{}\"\ntoken = \"expired\"\n",
        server.uri()
    ));

    let output = roomsync(&config, &["history", "room-1"]).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("history error"));
}
