//! Traits implemented outside the runtime core

mod event_sink;

pub use event_sink::{EventSink, Notice, NoticeKind};
