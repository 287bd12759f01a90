//! WebSocket close codes
//!
//! Gateway-specific close codes as interpreted by the client: whether a
//! given code leaves the session resumable decides IDENTIFY vs RESUME
//! on the next connect.

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error, try resuming
    UnknownError = 4000,
    /// Client sent an invalid opcode
    UnknownOpcode = 4001,
    /// Client sent a payload the server could not decode
    DecodeError = 4002,
    /// Client sent a payload before identifying
    NotAuthenticated = 4003,
    /// Credential rejected; the session can never be resumed
    AuthenticationFailed = 4004,
    /// Client identified twice on one connection
    AlreadyAuthenticated = 4005,
    /// Sequence number sent on resume was invalid
    InvalidSequence = 4007,
    /// Client sent payloads too quickly
    RateLimited = 4008,
    /// Session timed out server-side
    SessionTimeout = 4009,
    /// Invalid shard configuration
    InvalidShard = 4010,
    /// Sharding is required for this connection
    ShardingRequired = 4011,
    /// Invalid/outdated API version
    InvalidApiVersion = 4012,
    /// Invalid intent bits
    InvalidIntents = 4013,
    /// Intents the credential is not approved for
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimeout),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the session survives this close and may be resumed
    ///
    /// The invalid-configuration family permanently invalidates the
    /// session; everything else is a transient condition.
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidSequence
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownOpcode => "UnknownOpcode",
            Self::DecodeError => "DecodeError",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::AlreadyAuthenticated => "AlreadyAuthenticated",
            Self::InvalidSequence => "InvalidSequence",
            Self::RateLimited => "RateLimited",
            Self::SessionTimeout => "SessionTimeout",
            Self::InvalidShard => "InvalidShard",
            Self::ShardingRequired => "ShardingRequired",
            Self::InvalidApiVersion => "InvalidApiVersion",
            Self::InvalidIntents => "InvalidIntents",
            Self::DisallowedIntents => "DisallowedIntents",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u16())
    }
}

/// Decide resumability for an arbitrary close code
///
/// Normal (1000) and going-away (1001) closures end the session; the
/// session-invalidating gateway codes end it too. Any other code,
/// including ones this client does not know, is treated as transient.
#[must_use]
pub fn is_resumable_close(code: u16) -> bool {
    if code == 1000 || code == 1001 {
        return false;
    }
    CloseCode::from_u16(code).map_or(true, CloseCode::is_resumable)
}
