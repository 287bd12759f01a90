//! # parley-gateway
//!
//! The event plane: one WebSocket connection carrying a continuous
//! zlib-compressed JSON stream, driven by an opcode state machine with
//! heartbeating, zombie detection, session resumption, and an
//! unconditional reconnect loop.

pub mod client;
pub mod compression;
pub mod protocol;
pub mod session;

// Re-export commonly used types at crate root
pub use client::{GatewayClient, GatewayHandle};
pub use compression::{InflateError, Inflater};
pub use protocol::{
    CloseCode, GatewayMessage, HelloPayload, IdentifyPayload, IdentifyProperties, OpCode,
    ResumePayload,
};
pub use session::{SessionState, SessionStatus};
