//! Gateway intents - the capability bitmask declared at identify time
//!
//! The server only delivers event families the client has declared.
//! The bitmask is forwarded verbatim into the IDENTIFY payload.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Gateway event capability flags
    ///
    /// Serialized as the raw u64 value in JSON, matching the wire format
    /// of the IDENTIFY payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete and channel lifecycle events
        const GUILDS                    = 1 << 0;
        /// Member join/leave/update events
        const GUILD_MEMBERS             = 1 << 1;
        /// Ban and moderation events
        const GUILD_MODERATION          = 1 << 2;
        /// Emoji and sticker updates
        const GUILD_EXPRESSIONS         = 1 << 3;
        /// Voice state events
        const GUILD_VOICE_STATES        = 1 << 7;
        /// Presence updates
        const GUILD_PRESENCES           = 1 << 8;
        /// Message create/update/delete in guild channels
        const GUILD_MESSAGES            = 1 << 9;
        /// Reaction add/remove in guild channels
        const GUILD_MESSAGE_REACTIONS   = 1 << 10;
        /// Typing indicators in guild channels
        const GUILD_MESSAGE_TYPING      = 1 << 11;
        /// Message events in direct-message channels
        const DIRECT_MESSAGES           = 1 << 12;
        /// Reaction events in direct-message channels
        const DIRECT_MESSAGE_REACTIONS  = 1 << 13;
        /// Typing indicators in direct-message channels
        const DIRECT_MESSAGE_TYPING     = 1 << 14;
        /// Full message content in dispatched message payloads
        const MESSAGE_CONTENT           = 1 << 15;

        /// Default capability set for a text-focused client
        const DEFAULT = Self::GUILDS.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::DIRECT_MESSAGES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl Intents {
    /// Raw bitfield value, as carried in IDENTIFY
    #[inline]
    pub const fn bitfield(&self) -> u64 {
        self.bits()
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        // Unknown bits are preserved so newer server capabilities pass through
        Ok(Self::from_bits_retain(bits))
    }
}
