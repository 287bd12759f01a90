//! # parley-rest
//!
//! The HTTP control plane: a single-worker dispatcher that serializes
//! outgoing requests against server-declared per-route and global rate
//! limits, retrying transparently on throttling.

pub mod dispatcher;
pub mod error;
pub mod ratelimit;
pub mod request;
pub mod routes;

// Re-export commonly used types at crate root
pub use dispatcher::{GatewayInfo, RestDispatcher};
pub use error::{RestError, RestResult};
pub use ratelimit::{GlobalThrottle, RateLimitBucket, RateLimitTable, RateLimitUpdate};
pub use request::{Attachment, Method, Request, ResponseBody};
pub use routes::Route;
