//! Gateway protocol definitions
//!
//! Defines the wire protocol: op codes, the message envelope, payload
//! structures, and close codes.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{is_resumable_close, CloseCode};
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, ResumePayload};
