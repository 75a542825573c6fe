//! Control surface: the request/response interface the consumer uses
//! to manage the allow-list.
//!
//! One JSON request per line over a Unix socket, one JSON response per
//! line back. Error responses never mutate state.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::store::SourceStore;

/// One control request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ControlRequest {
    pub fn add_source(id: &str) -> Self {
        Self {
            method: "add_source".to_string(),
            source_id: Some(id.to_string()),
            enabled: None,
        }
    }

    pub fn remove_source(id: &str) -> Self {
        Self {
            method: "remove_source".to_string(),
            source_id: Some(id.to_string()),
            enabled: None,
        }
    }

    pub fn list_sources() -> Self {
        Self {
            method: "list_sources".to_string(),
            source_id: None,
            enabled: None,
        }
    }

    pub fn set_enabled(id: &str, enabled: bool) -> Self {
        Self {
            method: "set_enabled".to_string(),
            source_id: Some(id.to_string()),
            enabled: Some(enabled),
        }
    }

    pub fn is_enabled(id: &str) -> Self {
        Self {
            method: "is_enabled".to_string(),
            source_id: Some(id.to_string()),
            enabled: None,
        }
    }

    pub fn open_system_settings() -> Self {
        Self {
            method: "open_system_settings".to_string(),
            source_id: None,
            enabled: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    NotImplemented,
    Internal,
}

/// Response sent back to the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ControlResponse {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            result: Some(result),
            code: None,
            message: None,
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            code: Some(ErrorCode::InvalidArgument),
            message: Some(message.to_string()),
        }
    }

    pub fn not_implemented(method: &str) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            code: Some(ErrorCode::NotImplemented),
            message: Some(format!("Unknown method: {}", method)),
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            code: Some(ErrorCode::Internal),
            message: Some(message.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

/// Route one request to the store. Synchronous; every store operation
/// here is a short map update plus a small file write.
pub fn dispatch(store: &SourceStore, request: &ControlRequest) -> ControlResponse {
    match request.method.as_str() {
        "add_source" => match request.source_id.as_deref() {
            Some(id) => match store.add_source(id) {
                Ok(()) => ControlResponse::ok(true.into()),
                Err(e) => ControlResponse::internal(&e.to_string()),
            },
            None => ControlResponse::invalid_argument("source_id is required"),
        },
        "remove_source" => match request.source_id.as_deref() {
            Some(id) => match store.remove_source(id) {
                Ok(()) => ControlResponse::ok(true.into()),
                Err(e) => ControlResponse::internal(&e.to_string()),
            },
            None => ControlResponse::invalid_argument("source_id is required"),
        },
        "list_sources" => ControlResponse::ok(serde_json::json!(store.list_sources())),
        "set_enabled" => match request.source_id.as_deref() {
            Some(id) => {
                let enabled = request.enabled.unwrap_or(false);
                match store.set_enabled(id, enabled) {
                    Ok(()) => ControlResponse::ok(true.into()),
                    Err(e) => ControlResponse::internal(&e.to_string()),
                }
            }
            None => ControlResponse::invalid_argument("source_id is required"),
        },
        "is_enabled" => match request.source_id.as_deref() {
            Some(id) => ControlResponse::ok(store.is_enabled(id).into()),
            None => ControlResponse::invalid_argument("source_id is required"),
        },
        "open_system_settings" => {
            open_system_settings();
            ControlResponse::ok(true.into())
        }
        other => ControlResponse::not_implemented(other),
    }
}

/// Hand off to the platform's notification settings screen.
///
/// Best effort: the control surface reports success regardless of what
/// the desktop does with the request.
pub fn open_system_settings() {
    if let Err(e) = spawn_settings_opener() {
        warn!("Failed to open system notification settings: {}", e);
    }
}

#[cfg(target_os = "macos")]
fn spawn_settings_opener() -> std::io::Result<()> {
    std::process::Command::new("open")
        .arg("x-apple.systempreferences:com.apple.preference.notifications")
        .spawn()
        .map(|_| ())
}

#[cfg(target_os = "linux")]
fn spawn_settings_opener() -> std::io::Result<()> {
    // GNOME first; on other desktops hand the request to the
    // freedesktop opener.
    match std::process::Command::new("gnome-control-center")
        .arg("notifications")
        .spawn()
    {
        Ok(_) => Ok(()),
        Err(_) => std::process::Command::new("xdg-open")
            .arg("settings://notifications")
            .spawn()
            .map(|_| ()),
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn spawn_settings_opener() -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no notification settings opener for this platform",
    ))
}

/// Control server listening on a Unix socket.
pub struct ControlServer {
    socket_path: PathBuf,
    store: Arc<SourceStore>,
}

impl ControlServer {
    pub fn new(socket_path: PathBuf, store: Arc<SourceStore>) -> Self {
        Self { socket_path, store }
    }

    /// Bind the socket and serve requests until the task is dropped.
    pub async fn run(&self) -> Result<(), RelayError> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("Control surface listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let store = Arc::clone(&self.store);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, store).await {
                            error!("Control connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Control accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single consumer connection: one request per line.
async fn handle_connection(stream: UnixStream, store: Arc<SourceStore>) -> Result<(), RelayError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => dispatch(&store, &request),
            Err(e) => {
                warn!("Malformed control request: {}", e);
                ControlResponse::invalid_argument(&format!("Parse error: {}", e))
            }
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        line.clear();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SourceStore {
        SourceStore::open(dir.path().join("allow_list.toml")).unwrap()
    }

    #[test]
    fn test_add_list_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let response = dispatch(&store, &ControlRequest::add_source("kz.kaspi.mobile"));
        assert!(response.is_ok());
        assert_eq!(response.result, Some(true.into()));

        let response = dispatch(&store, &ControlRequest::list_sources());
        assert_eq!(response.result, Some(serde_json::json!(["kz.kaspi.mobile"])));
    }

    #[test]
    fn test_missing_source_id_is_invalid_argument() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        for method in ["add_source", "remove_source", "set_enabled", "is_enabled"] {
            let request = ControlRequest {
                method: method.to_string(),
                source_id: None,
                enabled: Some(true),
            };
            let response = dispatch(&store, &request);
            assert_eq!(response.status, ResponseStatus::Error, "method {}", method);
            assert_eq!(response.code, Some(ErrorCode::InvalidArgument));
        }

        // Nothing was registered or enabled by the failed calls.
        assert!(store.list_sources().is_empty());
    }

    #[test]
    fn test_set_enabled_missing_flag_defaults_to_false() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.add_source("kz.kaspi.mobile").unwrap();
        store.set_enabled("kz.kaspi.mobile", true).unwrap();

        let request = ControlRequest {
            method: "set_enabled".to_string(),
            source_id: Some("kz.kaspi.mobile".to_string()),
            enabled: None,
        };
        assert!(dispatch(&store, &request).is_ok());
        assert!(!store.is_enabled("kz.kaspi.mobile"));
    }

    #[test]
    fn test_is_enabled_unknown_source_is_false_not_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let response = dispatch(&store, &ControlRequest::is_enabled("never.seen"));
        assert!(response.is_ok());
        assert_eq!(response.result, Some(false.into()));
    }

    #[test]
    fn test_open_system_settings_always_reports_success() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // Succeeds from this layer's perspective whether or not the
        // desktop honors the hand-off.
        let response = dispatch(&store, &ControlRequest::open_system_settings());
        assert!(response.is_ok());
        assert_eq!(response.result, Some(true.into()));
    }

    #[test]
    fn test_unknown_method_is_not_implemented() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.add_source("kz.kaspi.mobile").unwrap();

        let request = ControlRequest {
            method: "reset_everything".to_string(),
            source_id: None,
            enabled: None,
        };
        let response = dispatch(&store, &request);
        assert_eq!(response.code, Some(ErrorCode::NotImplemented));

        // State untouched.
        assert_eq!(store.list_sources(), vec!["kz.kaspi.mobile"]);
    }

    #[tokio::test]
    async fn test_server_round_trip_over_socket() {
        use crate::client::ControlClient;

        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("control.sock");
        let store = Arc::new(store(&dir));

        let server = ControlServer::new(socket.clone(), Arc::clone(&store));
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        // Wait for the socket to come up.
        while !socket.exists() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let client = ControlClient::new(&socket);

        let response = client
            .call(&ControlRequest::add_source("kz.kaspi.mobile"))
            .await
            .unwrap();
        assert!(response.is_ok());

        let response = client
            .call(&ControlRequest::set_enabled("kz.kaspi.mobile", true))
            .await
            .unwrap();
        assert!(response.is_ok());

        let response = client
            .call(&ControlRequest::is_enabled("kz.kaspi.mobile"))
            .await
            .unwrap();
        assert_eq!(response.result, Some(true.into()));

        let sources = client.list_sources().await.unwrap();
        assert_eq!(sources, vec!["kz.kaspi.mobile"]);

        assert!(store.check("kz.kaspi.mobile"));
    }
}
