//! Best-effort delivery of extracted payloads to the consumer.
//!
//! While the consumer is running it listens on a Unix socket; the
//! bridge writes one JSON payload per line there. When the socket is
//! unreachable the bridge relaunches the consumer binary with the
//! payload attached as an argument, so the consumer picks it up once
//! it is back. At-most-once, no acknowledgment, no retry: a payload
//! that fails both paths is lost by design, and the failure is only
//! logged.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::RelayError;
use crate::event::RelayPayload;

/// Forwarding bridge between the relay and the consumer application.
pub struct ForwardingBridge {
    /// Socket the consumer listens on while active
    consumer_socket: PathBuf,
    /// Explicitly configured consumer binary, if any
    consumer_binary: Option<PathBuf>,
}

impl ForwardingBridge {
    pub fn new(consumer_socket: PathBuf, consumer_binary: Option<PathBuf>) -> Self {
        Self {
            consumer_socket,
            consumer_binary,
        }
    }

    /// Deliver a payload to the consumer, fire-and-forget.
    ///
    /// Never returns an error: any delivery failure is caught and
    /// logged here so the event pipeline keeps processing subsequent
    /// events normally.
    pub async fn forward(&self, payload: RelayPayload) {
        match self.send_direct(&payload).await {
            Ok(()) => {
                debug!("Delivered payload from {} to consumer socket", payload.source_id);
            }
            Err(e) => {
                debug!("Consumer socket unreachable ({}), relaunching consumer", e);
                if let Err(e) = self.relaunch_with_payload(&payload) {
                    error!("Dropping payload from {}: {}", payload.source_id, e);
                }
            }
        }
    }

    /// Write the payload as one JSON line to the consumer's socket.
    /// No response is awaited.
    async fn send_direct(&self, payload: &RelayPayload) -> Result<(), RelayError> {
        let mut stream = UnixStream::connect(&self.consumer_socket).await?;
        let json = serde_json::to_string(payload)?;

        stream.write_all(json.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Bring the consumer's entry point forward with the payload
    /// attached, so it can retrieve the payload once it is active.
    fn relaunch_with_payload(&self, payload: &RelayPayload) -> Result<(), RelayError> {
        let binary = self.find_consumer_binary().ok_or_else(|| {
            RelayError::ConsumerUnavailable("consumer binary not found".to_string())
        })?;
        let json = serde_json::to_string(payload)?;

        info!("Relaunching consumer {:?} with pending payload", binary);
        // The child is detached; tokio's reaper collects it when it
        // exits, so repeated relaunches never accumulate zombies.
        Command::new(&binary)
            .arg("--payload")
            .arg(json)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }

    fn find_consumer_binary(&self) -> Option<PathBuf> {
        if let Some(configured) = &self.consumer_binary {
            if configured.exists() {
                return Some(configured.clone());
            }
            return None;
        }

        for path in default_consumer_candidates() {
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Socket path the bridge delivers to
    pub fn consumer_socket(&self) -> &Path {
        &self.consumer_socket
    }
}

/// Well-known locations for the consumer binary when none is configured.
fn default_consumer_candidates() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    vec![
        exe_dir.join("expense-book"),
        PathBuf::from("/usr/local/bin/expense-book"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_forward_delivers_one_json_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let socket = dir.path().join("consumer.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let bridge = ForwardingBridge::new(socket, None);
        let payload = RelayPayload {
            source_id: "kz.kaspi.mobile".to_string(),
            text: "Kaspi Bank\nPayment of 1500 KZT to Shop".to_string(),
        };

        let accept = tokio::spawn(async move {
            let (stream, _addr) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            line
        });

        bridge.forward(payload.clone()).await;

        let line = accept.await.unwrap();
        let received: RelayPayload = serde_json::from_str(&line).unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn test_repeated_relaunches_do_not_error() {
        let dir = tempfile::TempDir::new().unwrap();
        // No listener on the socket, so every forward takes the
        // relaunch path against a real short-lived binary.
        let bridge = ForwardingBridge::new(
            dir.path().join("nobody-home.sock"),
            Some(PathBuf::from("/bin/sh")),
        );

        for n in 0..3 {
            bridge
                .forward(RelayPayload {
                    source_id: "kz.kaspi.mobile".to_string(),
                    text: format!("payment {}", n),
                })
                .await;
        }
    }

    #[tokio::test]
    async fn test_forward_swallows_delivery_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        // No listener, and a configured binary that does not exist:
        // both delivery paths fail.
        let bridge = ForwardingBridge::new(
            dir.path().join("nobody-home.sock"),
            Some(dir.path().join("missing-consumer")),
        );

        bridge
            .forward(RelayPayload {
                source_id: "kz.kaspi.mobile".to_string(),
                text: "5000 KZT debited".to_string(),
            })
            .await;
        // Reaching this point is the assertion: no panic, no error.
    }
}
