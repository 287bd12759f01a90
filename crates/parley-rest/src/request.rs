//! Request descriptors and response bodies

use crate::routes::Route;
use serde_json::Value;

pub use reqwest::Method;

/// A binary blob uploaded alongside a request body
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name presented to the server
    pub name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// One outgoing control-plane request
///
/// Created per call and destroyed on completion; the dispatcher
/// resolves every request exactly once.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub route: Route,
    /// Structured payload, sent as JSON or as the `payload_json`
    /// multipart field when attachments are present
    pub body: Option<Value>,
    /// Ordered attachment list; non-empty switches the body to multipart
    pub attachments: Vec<Attachment>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, route: Route) -> Self {
        Self {
            method,
            route,
            body: None,
            attachments: Vec::new(),
        }
    }

    /// Shorthand for a body-less GET
    #[must_use]
    pub fn get(route: Route) -> Self {
        Self::new(Method::GET, route)
    }

    /// Attach a structured body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append an attachment
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Decoded response delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// 204 or otherwise body-less success
    Empty,
    /// `application/json` response
    Json(Value),
    /// Any other content type
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// The parsed JSON value, if this was a JSON response
    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Empty | Self::Bytes(_) => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
