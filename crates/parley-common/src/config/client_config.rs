//! Client configuration struct
//!
//! Loads configuration from environment variables, with programmatic
//! overrides for embedding the runtime in a larger application.

use parley_core::Intents;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Runtime configuration for the REST dispatcher and gateway session
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Static credential sent in the Authorization header and IDENTIFY
    pub token: String,

    /// Base URL of the HTTP control plane
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bound on a single REST request, connect through body
    #[serde(default = "default_rest_timeout", with = "duration_ms")]
    pub rest_request_timeout: Duration,

    /// Fixed delay awaited between a disconnect and the next connect attempt
    #[serde(default = "default_reconnect_delay", with = "duration_ms")]
    pub reconnect_delay: Duration,

    /// Event capabilities declared in IDENTIFY
    #[serde(default)]
    pub intents: Intents,
}

impl ClientConfig {
    /// Create a configuration with the given token and all defaults
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: default_api_url(),
            rest_request_timeout: default_rest_timeout(),
            reconnect_delay: default_reconnect_delay(),
            intents: Intents::default(),
        }
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the REST request timeout
    #[must_use]
    pub fn with_rest_request_timeout(mut self, timeout: Duration) -> Self {
        self.rest_request_timeout = timeout;
        self
    }

    /// Override the reconnect delay
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Override the declared intents
    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `PARLEY_TOKEN` is missing or a numeric
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let token = env::var("PARLEY_TOKEN").map_err(|_| ConfigError::MissingVar("PARLEY_TOKEN"))?;
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PARLEY_TOKEN", "empty".to_string()));
        }

        Ok(Self {
            token,
            api_url: env::var("API_URL").unwrap_or_else(|_| default_api_url()),
            rest_request_timeout: parse_ms("REST_TIMEOUT_MS")?.unwrap_or_else(default_rest_timeout),
            reconnect_delay: parse_ms("RECONNECT_DELAY_MS")?.unwrap_or_else(default_reconnect_delay),
            intents: match env::var("GATEWAY_INTENTS") {
                Ok(raw) => {
                    let bits = raw
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidValue("GATEWAY_INTENTS", raw))?;
                    Intents::from_bits_retain(bits)
                }
                Err(_) => Intents::default(),
            },
        })
    }
}

fn parse_ms(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidValue(var, raw)),
        Err(_) => Ok(None),
    }
}

// Default value functions
fn default_api_url() -> String {
    "https://api.parley.chat/v1".to_string()
}

fn default_rest_timeout() -> Duration {
    Duration::from_millis(15_000)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_millis(5_000)
}

/// Deserialize durations given as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
