//! Integration test utilities for the parley client runtime
//!
//! This crate provides mock servers for both planes: a scripted HTTP
//! control plane and a WebSocket gateway speaking the server half of
//! the protocol.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;
