//! Event sink - where decoded gateway events leave the runtime
//!
//! Domain consumers (caches, command routers) implement this trait.
//! The gateway session calls `on_dispatch` exactly once per DISPATCH
//! frame, in receipt order; non-fatal runtime conditions arrive as
//! advisory notices rather than errors.

use async_trait::async_trait;
use serde_json::Value;

/// Advisory notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Informational (connection milestones, resumes)
    Info,
    /// Recoverable problem (dropped frame, decompression error)
    Warning,
}

/// Advisory notice emitted by the runtime
///
/// Notices describe conditions the runtime already recovered from;
/// they never require action from the consumer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    /// Create an informational notice
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    /// Create a warning notice
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }
}

/// Consumer of decoded gateway events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Called once per DISPATCH frame, in the order frames were received.
    ///
    /// `sequence` is the envelope's sequence number (0 when the server
    /// omitted it), `payload` the raw `d` field.
    async fn on_dispatch(&self, event: &str, sequence: u64, payload: Value);

    /// Called for advisory conditions the runtime recovered from.
    ///
    /// The default implementation drops the notice.
    async fn on_notice(&self, notice: Notice) {
        let _ = notice;
    }
}
