//! Wire types for inbound events and forwarded payloads.

use serde::{Deserialize, Serialize};

/// One notification event as delivered by the host environment.
///
/// Ephemeral: exists only for the duration of one
/// filter/extract/forward cycle and is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNotification {
    /// Package identifier of the application that posted the notification
    pub source_id: String,

    /// Notification title line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Short body text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Expanded body text, present when the notification carries a long form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_text: Option<String>,
}

/// Payload handed to the forwarding bridge after filtering and extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub source_id: String,
    pub text: String,
}
