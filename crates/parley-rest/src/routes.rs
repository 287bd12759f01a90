//! Route table for the control plane
//!
//! A [`Route`] pairs the fully resolved request path with the bucket
//! template it belongs to. Rate-limit buckets group parameterized
//! routes, so `/channels/1/messages` and `/channels/2/messages` share
//! the `/channels/:id/messages` template until the server assigns a
//! bucket id of its own.

use parley_core::Snowflake;

/// A templated route and its resolved path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Bucket attribution key (`:id`-style template)
    pub bucket: String,
    /// Resolved request path, appended to the API base URL
    pub path: String,
}

impl Route {
    /// Route with no parameters; template and path coincide
    fn fixed(path: &str) -> Self {
        Self {
            bucket: path.to_string(),
            path: path.to_string(),
        }
    }

    /// Gateway URL discovery
    #[must_use]
    pub fn gateway() -> Self {
        Self::fixed("/gateway")
    }

    /// Gateway URL discovery with session-start metadata
    #[must_use]
    pub fn gateway_bot() -> Self {
        Self::fixed("/gateway/bot")
    }

    /// A single user
    #[must_use]
    pub fn user(user_id: Snowflake) -> Self {
        Self {
            bucket: "/users/:id".to_string(),
            path: format!("/users/{user_id}"),
        }
    }

    /// The authenticated user
    #[must_use]
    pub fn current_user() -> Self {
        Self::fixed("/users/@me")
    }

    /// Guilds of the authenticated user
    #[must_use]
    pub fn current_user_guilds() -> Self {
        Self::fixed("/users/@me/guilds")
    }

    /// A single guild
    #[must_use]
    pub fn guild(guild_id: Snowflake) -> Self {
        Self {
            bucket: "/guilds/:id".to_string(),
            path: format!("/guilds/{guild_id}"),
        }
    }

    /// Channels of a guild
    #[must_use]
    pub fn guild_channels(guild_id: Snowflake) -> Self {
        Self {
            bucket: "/guilds/:id/channels".to_string(),
            path: format!("/guilds/{guild_id}/channels"),
        }
    }

    /// Members of a guild
    #[must_use]
    pub fn guild_members(guild_id: Snowflake) -> Self {
        Self {
            bucket: "/guilds/:id/members".to_string(),
            path: format!("/guilds/{guild_id}/members"),
        }
    }

    /// A single guild member
    #[must_use]
    pub fn guild_member(guild_id: Snowflake, user_id: Snowflake) -> Self {
        Self {
            bucket: "/guilds/:id/members/:id".to_string(),
            path: format!("/guilds/{guild_id}/members/{user_id}"),
        }
    }

    /// A single channel
    #[must_use]
    pub fn channel(channel_id: Snowflake) -> Self {
        Self {
            bucket: "/channels/:id".to_string(),
            path: format!("/channels/{channel_id}"),
        }
    }

    /// Messages of a channel
    #[must_use]
    pub fn channel_messages(channel_id: Snowflake) -> Self {
        Self {
            bucket: "/channels/:id/messages".to_string(),
            path: format!("/channels/{channel_id}/messages"),
        }
    }

    /// A single message
    #[must_use]
    pub fn channel_message(channel_id: Snowflake, message_id: Snowflake) -> Self {
        Self {
            bucket: "/channels/:id/messages/:id".to_string(),
            path: format!("/channels/{channel_id}/messages/{message_id}"),
        }
    }

    /// Typing indicator for a channel
    #[must_use]
    pub fn channel_typing(channel_id: Snowflake) -> Self {
        Self {
            bucket: "/channels/:id/typing".to_string(),
            path: format!("/channels/{channel_id}/typing"),
        }
    }

    /// A reaction by the authenticated user
    ///
    /// `emoji` must already be percent-encoded.
    #[must_use]
    pub fn own_reaction(channel_id: Snowflake, message_id: Snowflake, emoji: &str) -> Self {
        Self {
            bucket: "/channels/:id/messages/:id/reactions/:emoji/@me".to_string(),
            path: format!("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
        }
    }

    /// Global application commands
    #[must_use]
    pub fn application_commands(application_id: Snowflake) -> Self {
        Self {
            bucket: "/applications/:id/commands".to_string(),
            path: format!("/applications/{application_id}/commands"),
        }
    }

    /// Guild-scoped application commands
    #[must_use]
    pub fn application_guild_commands(application_id: Snowflake, guild_id: Snowflake) -> Self {
        Self {
            bucket: "/applications/:id/guilds/:id/commands".to_string(),
            path: format!("/applications/{application_id}/guilds/{guild_id}/commands"),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
