use crate::models::check::{Check, HttpMethod};
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Terminal classification of a probe that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeError {
    Timeout,
    Transport(String),
}

/// The raw result of one probe attempt: a status code, or the error that
/// ended the attempt first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
}

impl CheckOutcome {
    pub fn response(code: u16) -> Self {
        Self {
            error: None,
            response_code: Some(code),
        }
    }

    pub fn timeout() -> Self {
        Self {
            error: Some(OutcomeError::Timeout),
            response_code: None,
        }
    }

    pub fn transport(cause: impl Into<String>) -> Self {
        Self {
            error: Some(OutcomeError::Transport(cause.into())),
            response_code: None,
        }
    }
}

/// One-shot outcome delivery for a single probe. Several events may race to
/// finish a probe (response, transport error, timer); the first
/// compare-and-set winner sends on the channel and every later delivery is a
/// no-op, so the processor runs exactly once per probe and a fired timeout
/// reliably discards a late response.
pub struct OutcomeSlot {
    delivered: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<CheckOutcome>>>,
}

impl OutcomeSlot {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<CheckOutcome>) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Self {
            delivered: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        });
        (slot, rx)
    }

    /// Returns true only for the first delivery.
    pub fn deliver(&self, outcome: CheckOutcome) -> bool {
        if self
            .delivered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if let Ok(mut guard) = self.tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(outcome);
            }
        }
        true
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Issue one outbound request for the check with its hard per-check timeout
/// and classify the outcome. Exactly one of response / transport error /
/// timeout wins, via the OutcomeSlot.
pub async fn perform_check(client: &Client, check: &Check) -> CheckOutcome {
    let target = format!("{}://{}", check.protocol, check.url);
    let url = match reqwest::Url::parse(&target) {
        Ok(url) => url,
        Err(e) => return CheckOutcome::transport(format!("invalid url {target}: {e}")),
    };

    let timeout = Duration::from_secs(u64::from(check.timeout_seconds));
    let (slot, rx) = OutcomeSlot::new();

    // The request carries its own timeout as well, so this task always
    // terminates even when the timer below has already won the race.
    let request = client
        .request(reqwest_method(check.method), url)
        .timeout(timeout);
    let request_slot = Arc::clone(&slot);
    tokio::spawn(async move {
        match request.send().await {
            Ok(response) => {
                request_slot.deliver(CheckOutcome::response(response.status().as_u16()))
            }
            Err(e) if e.is_timeout() => request_slot.deliver(CheckOutcome::timeout()),
            Err(e) => request_slot.deliver(CheckOutcome::transport(e.to_string())),
        };
    });

    let timer_slot = Arc::clone(&slot);
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        timer_slot.deliver(CheckOutcome::timeout());
    });

    match rx.await {
        Ok(outcome) => outcome,
        // Both senders gone without a send: only possible at runtime
        // teardown. Classify as transport so the pipeline still terminates.
        Err(_) => CheckOutcome::transport("probe outcome channel closed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check::{CheckState, Protocol};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn check_for(addr: SocketAddr, timeout_seconds: u8) -> Check {
        Check {
            id: "abcdefghij0123456789".into(),
            user_phone: "5551234567".into(),
            protocol: Protocol::Http,
            url: format!("{addr}"),
            method: HttpMethod::Get,
            success_codes: vec![200],
            timeout_seconds,
            state: CheckState::Down,
            last_checked: None,
        }
    }

    #[tokio::test]
    async fn slot_accepts_only_the_first_outcome() {
        let (slot, rx) = OutcomeSlot::new();
        assert!(slot.deliver(CheckOutcome::response(200)));
        assert!(!slot.deliver(CheckOutcome::timeout()));
        assert!(!slot.deliver(CheckOutcome::transport("late")));
        assert_eq!(rx.await.unwrap(), CheckOutcome::response(200));
    }

    #[tokio::test]
    async fn concurrent_racers_deliver_exactly_once() {
        for _ in 0..100 {
            let (slot, rx) = OutcomeSlot::new();

            let a = {
                let slot = Arc::clone(&slot);
                tokio::spawn(async move { slot.deliver(CheckOutcome::response(200)) })
            };
            let b = {
                let slot = Arc::clone(&slot);
                tokio::spawn(async move { slot.deliver(CheckOutcome::timeout()) })
            };

            let (a, b) = (a.await.unwrap(), b.await.unwrap());
            assert!(a ^ b, "exactly one racer must win");

            let outcome = rx.await.unwrap();
            if a {
                assert_eq!(outcome, CheckOutcome::response(200));
            } else {
                assert_eq!(outcome, CheckOutcome::timeout());
            }
        }
    }

    #[tokio::test]
    async fn probe_classifies_a_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        });

        let outcome = perform_check(&Client::new(), &check_for(addr, 3)).await;
        assert_eq!(outcome, CheckOutcome::response(200));
    }

    #[tokio::test]
    async fn probe_classifies_connection_refused_as_transport() {
        // Bind then drop to find a port with no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = perform_check(&Client::new(), &check_for(addr, 3)).await;
        match outcome.error {
            Some(OutcomeError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
        assert_eq!(outcome.response_code, None);
    }

    #[tokio::test]
    async fn probe_times_out_against_a_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection open without ever answering.
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let outcome = perform_check(&Client::new(), &check_for(addr, 1)).await;
        assert_eq!(outcome.error, Some(OutcomeError::Timeout));
        assert_eq!(outcome.response_code, None);
    }

    #[tokio::test]
    async fn unparseable_target_is_a_transport_outcome() {
        let mut check = check_for("127.0.0.1:80".parse().unwrap(), 3);
        check.url = "exa mple com".into();

        let outcome = perform_check(&Client::new(), &check).await;
        match outcome.error {
            Some(OutcomeError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
