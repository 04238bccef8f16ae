//! End-to-end runs of the check pipeline (read -> validate -> probe ->
//! process) against a tempdir store and a local HTTP stub.

use pulsewatch::config::Config;
use pulsewatch::models::check::{Check, CheckState, HttpMethod, Protocol};
use pulsewatch::services::twilio_service::TwilioService;
use pulsewatch::services::worker::outcome::process_outcome;
use pulsewatch::services::worker::probe::{perform_check, OutcomeError};
use pulsewatch::services::worker::validation::validate_check;
use pulsewatch::services::worker::CHECKS;
use pulsewatch::store::{FileStore, LogStore};
use pulsewatch::AppState;
use reqwest::Client;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const CHECK_ID: &str = "abcdefghij0123456789";

fn test_config(data_dir: &Path, log_dir: &Path) -> Config {
    Config {
        env_name: "test".into(),
        http_port: 0,
        data_dir: data_dir.to_path_buf(),
        log_dir: log_dir.to_path_buf(),
        check_interval_secs: 60,
        log_rotation_interval_secs: 60 * 60 * 24,
        max_checks: 5,
        twilio_account_sid: String::new(),
        twilio_auth_token: String::new(),
        twilio_from_phone: String::new(),
    }
}

async fn test_state(dir: &TempDir) -> AppState {
    let data_dir = dir.path().join("data");
    let log_dir = dir.path().join("logs");
    let config = test_config(&data_dir, &log_dir);

    AppState {
        store: Arc::new(FileStore::open(&data_dir).await.unwrap()),
        logs: Arc::new(LogStore::open(&log_dir).await.unwrap()),
        notifier: Arc::new(TwilioService::new(
            String::new(),
            String::new(),
            String::new(),
        )),
        config: Arc::new(config),
    }
}

/// One-shot HTTP server answering with the given status code.
async fn stub_server(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        let response = format!(
            "HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        );
        let _ = socket.write_all(response.as_bytes()).await;
    });
    addr
}

fn check_record(addr: SocketAddr, state: CheckState, last_checked: Option<i64>) -> Check {
    Check {
        id: CHECK_ID.into(),
        user_phone: "5551234567".into(),
        protocol: Protocol::Http,
        url: format!("{addr}"),
        method: HttpMethod::Get,
        success_codes: vec![200],
        timeout_seconds: 3,
        state,
        last_checked,
    }
}

async fn run_pipeline(state: &AppState) {
    let raw = state.store.read_raw(CHECKS, CHECK_ID).await.unwrap();
    let check = validate_check(&raw)
        .check
        .expect("stored record should be eligible");
    let outcome = perform_check(&Client::new(), &check).await;
    process_outcome(state, check, outcome).await;
}

async fn log_entries(state: &AppState) -> Vec<serde_json::Value> {
    let path = state.logs.base_dir().join(format!("{CHECK_ID}.log"));
    let bytes = tokio::fs::read(path).await.unwrap();
    bytes
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect()
}

// Scenario: an up check whose probe answers 500 goes down and warrants an
// alert.
#[tokio::test]
async fn failing_probe_transitions_an_up_check_to_down_and_flags_an_alert() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let addr = stub_server(500).await;
    let check = check_record(addr, CheckState::Up, Some(1000));
    state.store.create(CHECKS, CHECK_ID, &check).await.unwrap();

    run_pipeline(&state).await;

    let updated: Check = state.store.read(CHECKS, CHECK_ID).await.unwrap();
    assert_eq!(updated.state, CheckState::Down);
    assert!(updated.last_checked.unwrap() > 1000);

    let entries = log_entries(&state).await;
    assert_eq!(entries.len(), 1, "exactly one log entry per probe");
    assert_eq!(entries[0]["state"], "down");
    assert_eq!(entries[0]["alert"], true);
    assert_eq!(entries[0]["outcome"]["responseCode"], 500);
}

// Scenario: a check's first-ever probe never alerts, even on a healthy
// response.
#[tokio::test]
async fn first_probe_records_state_without_alerting() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let addr = stub_server(200).await;
    let check = check_record(addr, CheckState::Down, None);
    state.store.create(CHECKS, CHECK_ID, &check).await.unwrap();

    run_pipeline(&state).await;

    let updated: Check = state.store.read(CHECKS, CHECK_ID).await.unwrap();
    assert_eq!(updated.state, CheckState::Up);
    assert!(updated.last_checked.is_some());

    let entries = log_entries(&state).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["state"], "up");
    assert_eq!(entries[0]["alert"], false);
}

// Scenario: a probe that exceeds its timeout classifies as down with a
// timeout outcome.
#[tokio::test]
async fn silent_server_times_out_into_a_down_state() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    // Accepts the connection and never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        drop(socket);
    });

    let mut check = check_record(addr, CheckState::Up, Some(1000));
    check.timeout_seconds = 1;
    state.store.create(CHECKS, CHECK_ID, &check).await.unwrap();

    run_pipeline(&state).await;

    let updated: Check = state.store.read(CHECKS, CHECK_ID).await.unwrap();
    assert_eq!(updated.state, CheckState::Down);

    let entries = log_entries(&state).await;
    assert_eq!(entries[0]["outcome"]["error"], "timeout");
    assert!(entries[0]["outcome"].get("responseCode").is_none());
}

// Scenario: a malformed stored record is skipped before any probe happens.
#[tokio::test]
async fn malformed_record_is_ineligible_and_never_probed() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    // No timeoutSeconds.
    let raw = serde_json::json!({
        "id": CHECK_ID,
        "userPhone": "5551234567",
        "protocol": "http",
        "url": "example.com",
        "method": "get",
        "successCodes": [200],
        "state": "up",
        "lastChecked": 1000
    });
    state.store.create(CHECKS, CHECK_ID, &raw).await.unwrap();

    let stored = state.store.read_raw(CHECKS, CHECK_ID).await.unwrap();
    let validation = validate_check(&stored);
    assert!(!validation.fields.eligible());
    assert!(validation.check.is_none());
    assert_eq!(validation.fields.failing(), vec!["timeoutSeconds"]);

    // The record itself is untouched and no log entry was produced.
    let unchanged = state.store.read_raw(CHECKS, CHECK_ID).await.unwrap();
    assert_eq!(unchanged, raw);
    let log_path = state.logs.base_dir().join(format!("{CHECK_ID}.log"));
    assert!(!log_path.exists());
}

// A steady state (up -> up) appends a log entry but does not flag an alert.
#[tokio::test]
async fn steady_state_does_not_alert() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let addr = stub_server(200).await;
    let check = check_record(addr, CheckState::Up, Some(1000));
    state.store.create(CHECKS, CHECK_ID, &check).await.unwrap();

    run_pipeline(&state).await;

    let updated: Check = state.store.read(CHECKS, CHECK_ID).await.unwrap();
    assert_eq!(updated.state, CheckState::Up);

    let entries = log_entries(&state).await;
    assert_eq!(entries[0]["alert"], false);
}

// A transport-level failure (nothing listening) is down, not a crash.
#[tokio::test]
async fn connection_refused_is_recorded_as_down() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let check = check_record(addr, CheckState::Up, Some(1000));
    state.store.create(CHECKS, CHECK_ID, &check).await.unwrap();

    let outcome = perform_check(&Client::new(), &check).await;
    assert!(matches!(outcome.error, Some(OutcomeError::Transport(_))));

    process_outcome(&state, check, outcome).await;
    let updated: Check = state.store.read(CHECKS, CHECK_ID).await.unwrap();
    assert_eq!(updated.state, CheckState::Down);
}
