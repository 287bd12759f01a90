//! Session state
//!
//! All fields here are mutated exclusively by the single gateway
//! event-processing task; no locking is needed beyond that ownership.

use crate::protocol::OpCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Lifecycle status of the gateway session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Never connected
    Idle,
    /// Resolving the URL / opening the socket
    Connecting,
    /// Socket open, waiting for HELLO
    Handshaking,
    /// IDENTIFY sent, waiting for READY
    Identifying,
    /// RESUME sent, waiting for replay
    Resuming,
    /// Live and dispatching events
    Ready,
    /// Awaiting the reconnect delay
    Reconnecting,
    /// Torn down (terminal unless reconnecting)
    Disconnected,
}

impl SessionStatus {
    /// Which client-sent op codes are legal in this status
    ///
    /// The transition table makes illegal sends detectable in tests
    /// instead of surfacing as server-side close codes.
    #[must_use]
    pub fn may_send(self, op: OpCode) -> bool {
        match op {
            OpCode::Identify => matches!(self, Self::Handshaking | Self::Identifying),
            OpCode::Resume => matches!(self, Self::Handshaking | Self::Resuming),
            OpCode::Heartbeat => matches!(
                self,
                Self::Handshaking | Self::Identifying | Self::Resuming | Self::Ready
            ),
            // Server-only op codes are never sendable
            _ => false,
        }
    }

    /// Get the name of this status
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State owned by the gateway session
///
/// `session_id` and `resume_url` are kept behind accessors so the
/// both-present-or-both-absent invariant cannot be broken piecemeal.
#[derive(Debug)]
pub struct SessionState {
    /// Current lifecycle status
    pub status: SessionStatus,

    /// Last sequence number observed from the server
    pub sequence: Option<u64>,

    session_id: Option<String>,
    resume_url: Option<String>,

    /// Interval announced by HELLO
    pub heartbeat_interval: Option<Duration>,

    /// When the most recent heartbeat went out
    pub last_heartbeat_sent: Option<Instant>,

    /// A heartbeat is awaiting its ACK
    pub ack_pending: bool,

    /// Round-trip measured from the most recent ACKed heartbeat
    pub latency: Option<Duration>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            sequence: None,
            session_id: None,
            resume_url: None,
            heartbeat_interval: None,
            last_heartbeat_sent: None,
            ack_pending: false,
            latency: None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    /// RESUME is attempted iff both identity fields are present
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.resume_url.is_some()
    }

    /// Capture session identity from a READY event
    ///
    /// A READY without a resume URL leaves the session non-resumable:
    /// storing half an identity would break the pairing invariant.
    pub fn record_ready(&mut self, session_id: Option<String>, resume_url: Option<String>) {
        match (session_id, resume_url) {
            (Some(id), Some(url)) => {
                self.session_id = Some(id);
                self.resume_url = Some(url);
            }
            _ => self.clear_identity(),
        }
        self.status = SessionStatus::Ready;
    }

    /// Forget everything that would allow a resume
    pub fn clear_identity(&mut self) {
        self.session_id = None;
        self.resume_url = None;
        self.sequence = None;
    }

    /// Track the envelope sequence counter
    pub fn observe_sequence(&mut self, sequence: Option<u64>) {
        if let Some(s) = sequence {
            self.sequence = Some(s);
        }
    }

    /// Reset per-connection bookkeeping (survives: identity + sequence)
    pub fn reset_connection(&mut self) {
        self.heartbeat_interval = None;
        self.last_heartbeat_sent = None;
        self.ack_pending = false;
        self.latency = None;
    }

    /// A heartbeat was just sent
    pub fn note_heartbeat_sent(&mut self, now: Instant) {
        self.ack_pending = true;
        self.last_heartbeat_sent = Some(now);
    }

    /// The server acknowledged the outstanding heartbeat
    pub fn note_heartbeat_ack(&mut self, now: Instant) {
        self.ack_pending = false;
        self.latency = self
            .last_heartbeat_sent
            .map(|sent| now.saturating_duration_since(sent));
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
