//! Consumer- and host-side socket helpers.
//!
//! The consumer drives the allow-list through [`ControlClient`]; host
//! shims (and tests) push events with [`send_event`].

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::control::{ControlRequest, ControlResponse};
use crate::error::RelayError;
use crate::event::RawNotification;

/// Client for the relay's control socket.
pub struct ControlClient {
    socket_path: PathBuf,
}

impl ControlClient {
    pub fn new<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Send one request and read the one-line response.
    pub async fn call(&self, request: &ControlRequest) -> Result<ControlResponse, RelayError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let json = serde_json::to_string(request)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut response_line = String::new();
        reader.read_line(&mut response_line).await?;

        Ok(serde_json::from_str(&response_line)?)
    }

    /// Registered sources, unwrapped from the response.
    pub async fn list_sources(&self) -> Result<Vec<String>, RelayError> {
        let response = self.call(&ControlRequest::list_sources()).await?;
        match response.result {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(RelayError::Control(
                response
                    .message
                    .unwrap_or_else(|| "missing result".to_string()),
            )),
        }
    }
}

/// Push one notification event to the relay's event socket. The event
/// socket never responds; delivery into the pipeline is one-way.
pub async fn send_event(socket_path: &Path, event: &RawNotification) -> Result<(), RelayError> {
    let mut stream = UnixStream::connect(socket_path).await?;
    let json = serde_json::to_string(event)?;

    stream.write_all(json.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    Ok(())
}
