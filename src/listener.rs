//! Event ingestion: the socket server that receives notification
//! events from the host environment and drives the
//! filter -> extract -> forward pipeline.
//!
//! One JSON event per line. The host callback is not request/response
//! and is never retried, so nothing is written back on this socket.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use crate::bridge::ForwardingBridge;
use crate::error::RelayError;
use crate::event::{RawNotification, RelayPayload};
use crate::{extract, filter};
use crate::store::SourceStore;

/// Event-ingestion server.
pub struct EventListener {
    socket_path: PathBuf,
    store: Arc<SourceStore>,
    bridge: Arc<ForwardingBridge>,
}

impl EventListener {
    pub fn new(
        socket_path: PathBuf,
        store: Arc<SourceStore>,
        bridge: Arc<ForwardingBridge>,
    ) -> Self {
        Self {
            socket_path,
            store,
            bridge,
        }
    }

    /// Bind the socket and process inbound events until the task is
    /// dropped.
    pub async fn run(&self) -> Result<(), RelayError> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("Event listener on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let store = Arc::clone(&self.store);
                    let bridge = Arc::clone(&self.bridge);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, store, bridge).await {
                            error!("Event connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Event accept error: {}", e);
                }
            }
        }
    }
}

/// Handle one host connection, one event per line.
async fn handle_connection(
    stream: UnixStream,
    store: Arc<SourceStore>,
    bridge: Arc<ForwardingBridge>,
) -> Result<(), RelayError> {
    info!("Notification source connected");

    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        match serde_json::from_str::<RawNotification>(&line) {
            Ok(event) => process_event(&store, &bridge, event).await,
            Err(e) => {
                warn!("Malformed notification event, skipping: {}", e);
            }
        }
        line.clear();
    }

    info!("Notification source disconnected");
    Ok(())
}

/// Run one event through filter, extraction, and forwarding.
///
/// Infallible by contract: a dropped or undeliverable event affects
/// only itself, and the caller keeps accepting subsequent events.
pub async fn process_event(
    store: &SourceStore,
    bridge: &ForwardingBridge,
    event: RawNotification,
) {
    if !filter::should_process(store, &event) {
        return;
    }

    let text = extract::extract(&event);
    info!("Accepted notification from {} ({} chars)", event.source_id, text.len());

    bridge
        .forward(RelayPayload {
            source_id: event.source_id,
            text,
        })
        .await;
}
