//! Tracing and logging setup
//!
//! Configures the `tracing` subscriber with environment-based filtering.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter when `RUST_LOG` is unset
    pub level: Level,
    /// Enable JSON output format
    pub json: bool,
    /// Include file and line numbers
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            file_line: true,
        }
    }
}

impl TracingConfig {
    /// Development configuration with debug logging
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json: false,
            file_line: true,
        }
    }

    /// Production configuration with JSON logging
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json: true,
            file_line: false,
        }
    }
}

/// Initialize the tracing subscriber with default configuration
///
/// Uses the `RUST_LOG` environment variable for filtering if set.
///
/// # Panics
/// Panics if a subscriber is already installed; use [`try_init_tracing`]
/// from code that may run more than once.
pub fn init_tracing() {
    try_init_tracing_with_config(TracingConfig::default())
        .expect("tracing subscriber already initialized");
}

/// Try to initialize tracing, tolerating repeated calls
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init()
    };

    result.map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
