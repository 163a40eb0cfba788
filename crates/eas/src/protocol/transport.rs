//! Transport abstraction for ActiveSync round-trips
//!
//! The executor only needs "send request bytes, receive status and response
//! bytes or a classified error". [`HttpTransport`](super::HttpTransport) is
//! the production implementation; [`MockTransport`] serves scripted replies.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::wbxml::{self, Element};
use crate::models::AccountContext;

pub const WBXML_CONTENT_TYPE: &str = "application/vnd.ms-sync.wbxml";
pub const RFC822_CONTENT_TYPE: &str = "message/rfc822";

/// Why a request never produced an HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    UnknownHost,
    Timeout,
    ConnectionFailed,
    Tls,
    Io,
    /// Server answered but asked us to come back later (503 and friends)
    ServerUnavailable,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkErrorKind::UnknownHost => "unknown host",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::ConnectionFailed => "connection failed",
            NetworkErrorKind::Tls => "tls",
            NetworkErrorKind::Io => "io",
            NetworkErrorKind::ServerUnavailable => "server unavailable",
        };
        f.write_str(s)
    }
}

/// Transport failure with its classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One command POST
#[derive(Debug, Clone)]
pub struct EasRequest {
    /// Value of the Cmd query parameter
    pub command: &'static str,
    /// Query parameters beyond Cmd/User/DeviceId/DeviceType
    pub extra_query: Vec<(&'static str, String)>,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub timeout: Duration,
}

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EasReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl EasReply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }
}

/// Channel to an ActiveSync server
pub trait EasTransport: Send + Sync {
    /// Send a command. Implementations enforce their own connect timeout
    /// and honor `request.timeout` for the whole exchange.
    fn post(&self, account: &AccountContext, request: &EasRequest) -> Result<EasReply, TransportError>;
}

/// A request as seen by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub command: String,
    pub policy_key: String,
    pub extra_query: Vec<(String, String)>,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// The WBXML body decoded, if it was WBXML
    pub fn document(&self) -> Option<Element> {
        if self.content_type != WBXML_CONTENT_TYPE || self.body.is_empty() {
            return None;
        }
        wbxml::decode(&self.body).ok()
    }
}

type RequestHook = Box<dyn FnMut(&RecordedRequest, usize) + Send>;

/// Scripted transport for tests and offline tooling.
///
/// Replies are served in FIFO order. Running out of replies yields a
/// connection failure so tests fail loudly instead of hanging.
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<EasReply, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    on_request: Mutex<Option<RequestHook>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            on_request: Mutex::new(None),
        }
    }

    pub fn push_reply(&self, reply: Result<EasReply, TransportError>) {
        self.replies.lock().push_back(reply);
    }

    /// Queue a 200 response carrying `doc`
    pub fn push_document(&self, doc: &Element) {
        self.push_reply(Ok(EasReply::ok(wbxml::encode(doc))));
    }

    /// Queue a 200 response with an empty body
    pub fn push_empty(&self) {
        self.push_reply(Ok(EasReply::ok(Vec::new())));
    }

    /// Queue a bodiless response with the given HTTP status
    pub fn push_http_status(&self, status: u16) {
        self.push_reply(Ok(EasReply {
            status,
            body: Vec::new(),
        }));
    }

    pub fn push_error(&self, kind: NetworkErrorKind) {
        self.push_reply(Err(TransportError::new(kind, "scripted failure")));
    }

    /// Run `hook` after each request is recorded, with the 1-based count
    pub fn on_request(&self, hook: impl FnMut(&RecordedRequest, usize) + Send + 'static) {
        *self.on_request.lock() = Some(Box::new(hook));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn pending_replies(&self) -> usize {
        self.replies.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EasTransport for MockTransport {
    fn post(&self, account: &AccountContext, request: &EasRequest) -> Result<EasReply, TransportError> {
        let recorded = RecordedRequest {
            command: request.command.to_string(),
            policy_key: account.policy_key_header().to_string(),
            extra_query: request
                .extra_query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            content_type: request.content_type.to_string(),
            body: request.body.clone(),
        };
        let count = {
            let mut requests = self.requests.lock();
            requests.push(recorded.clone());
            requests.len()
        };
        if let Some(hook) = self.on_request.lock().as_mut() {
            hook(&recorded, count);
        }

        self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                NetworkErrorKind::ConnectionFailed,
                format!("no scripted reply for {}", request.command),
            ))
        })
    }
}
