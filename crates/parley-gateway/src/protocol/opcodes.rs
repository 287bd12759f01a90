//! Gateway operation codes
//!
//! Op codes define the type of message flowing over the WebSocket
//! connection, as seen from the client side.

/// Gateway operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Server dispatches an event (server only)
    Dispatch = 0,
    /// Heartbeat - keep connection alive (client, or server-requested)
    Heartbeat = 1,
    /// Identify - authenticate a new session (client only)
    Identify = 2,
    /// Resume - reattach to a dropped session (client only)
    Resume = 6,
    /// Reconnect - server requests the client reconnect (server only)
    Reconnect = 7,
    /// Invalid Session - session rejected (server only)
    InvalidSession = 9,
    /// Hello - sent on connect with the heartbeat interval (server only)
    Hello = 10,
    /// Heartbeat ACK (server only)
    HeartbeatAck = 11,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this op code can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(self, Self::Heartbeat | Self::Identify | Self::Resume)
    }

    /// Check if this op code can be sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        matches!(
            self,
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
