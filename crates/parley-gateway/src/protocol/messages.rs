//! Gateway message envelope
//!
//! Every frame on the wire is a `{op, d, s, t}` envelope. The op field
//! stays a raw integer here so that unknown server opcodes parse
//! cleanly and can be skipped instead of killing the frame.

use super::{HelloPayload, IdentifyPayload, OpCode, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Raw operation code
    pub op: u8,

    /// Event data payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,

    /// Sequence number (only on op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event type (only on op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    // === Client Messages ===

    /// Create a Heartbeat message (op=1) carrying the last sequence
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat.as_u8(),
            d: Some(sequence.map_or(Value::Null, |s| Value::Number(s.into()))),
            s: None,
            t: None,
        }
    }

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self {
            op: OpCode::Identify.as_u8(),
            d: serde_json::to_value(payload).ok(),
            s: None,
            t: None,
        }
    }

    /// Create a Resume message (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self {
            op: OpCode::Resume.as_u8(),
            d: serde_json::to_value(payload).ok(),
            s: None,
            t: None,
        }
    }

    // === Parsing Server Messages ===

    /// The typed op code, when this client knows it
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    /// Try to parse as a Hello payload (op=10)
    #[must_use]
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.opcode() != Some(OpCode::Hello) {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Resumability flag of an Invalid Session message (op=9)
    ///
    /// A missing or malformed payload reads as not resumable.
    #[must_use]
    pub fn invalid_session_resumable(&self) -> bool {
        self.d.as_ref().and_then(Value::as_bool).unwrap_or(false)
    }

    /// Split a Dispatch message (op=0) into `(event, sequence, data)`
    #[must_use]
    pub fn into_dispatch(self) -> Option<(String, Option<u64>, Value)> {
        if OpCode::from_u8(self.op) != Some(OpCode::Dispatch) {
            return None;
        }
        let event = self.t?;
        Some((event, self.s, self.d.unwrap_or(Value::Null)))
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "GatewayMessage(op={op}")?,
            None => write!(f, "GatewayMessage(op={}?", self.op)?,
        }
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}
