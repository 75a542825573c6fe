//! Notification Relay
//!
//! This crate filters notification events from trusted sources (banking
//! apps) against a user-managed allow-list, extracts a normalized text
//! payload from each accepted event, and forwards it to a consumer
//! application for further parsing into transactions:
//!
//! - **Store**: persisted registry of allowed sources and per-source
//!   enabled flags
//! - **Filter**: pass/drop decision consulting the store
//! - **Extractor**: title + body combination with an expanded-text
//!   fallback chain
//! - **Bridge**: best-effort delivery over a Unix socket, relaunching
//!   the consumer with the payload attached when it is not running
//! - **Control surface**: JSON request/response interface the consumer
//!   uses to manage the allow-list
//!
//! # Architecture
//!
//! The daemon serves two Unix sockets: an event socket receiving one
//! JSON notification per line from the host environment, and a control
//! socket serving allow-list requests. Downstream transaction parsing
//! is out of scope; the consumer receives only `{source_id, text}`.

pub mod bridge;
pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod extract;
pub mod filter;
pub mod listener;
pub mod store;

// Re-export commonly used types
pub use bridge::ForwardingBridge;
pub use client::ControlClient;
pub use config::RelayConfig;
pub use control::{ControlRequest, ControlResponse, ControlServer, ErrorCode, ResponseStatus};
pub use error::RelayError;
pub use event::{RawNotification, RelayPayload};
pub use listener::EventListener;
pub use store::SourceStore;
