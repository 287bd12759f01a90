//! Client configuration

mod client_config;

pub use client_config::{ClientConfig, ConfigError};
