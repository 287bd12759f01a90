//! Payload definitions for client-sent and server-sent messages

use parley_core::Intents;
use serde::{Deserialize, Serialize};

/// Payload of op 10 (Hello)
///
/// First message the server sends on any connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload of op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Static credential
    pub token: String,

    /// Declared event capabilities
    pub intents: Intents,

    /// Client identification metadata
    pub properties: IdentifyProperties,

    /// Whether the client accepts the compressed stream
    pub compress: bool,
}

impl IdentifyPayload {
    /// Build an identify payload requesting the compressed stream
    #[must_use]
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: IdentifyProperties::default(),
            compress: true,
        }
    }
}

/// Client identification metadata sent inside IDENTIFY
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,
    /// Library name, reported as the browser
    pub browser: String,
    /// Library name, reported as the device
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "parley".to_string(),
            device: "parley".to_string(),
        }
    }
}

/// Payload of op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Static credential
    pub token: String,

    /// Session to reattach to
    pub session_id: String,

    /// Last sequence number observed before the disconnect
    pub seq: Option<u64>,
}
