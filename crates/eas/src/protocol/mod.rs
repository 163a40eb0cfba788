//! ActiveSync wire protocol
//!
//! - [`wbxml`] and [`tags`]: the binary XML codec and its code pages
//! - command modules: request builders and response parsers that turn
//!   server documents into delta batches
//! - [`executor`]: one classified round-trip per call, no storage access
//! - [`transport`]: the byte channel, with an HTTP and a scripted
//!   implementation

pub mod executor;
pub mod folder_sync;
mod http;
pub mod item_sync;
pub mod move_items;
pub mod provision;
pub mod send_mail;
mod status;
pub mod tags;
pub mod transport;
pub mod wbxml;

pub use executor::{ExchangeFailure, OperationExecutor, OperationKind, OperationOutcome, Payload};
pub use folder_sync::{FolderDelta, FolderDeltaBatch};
pub use http::HttpTransport;
pub use item_sync::{ItemCommand, ItemDeltaBatch, ItemSyncRequest, MessageDelta, ResponseKind};
pub use move_items::{MessageMove, MoveResponse};
pub use status::OperationStatus;
pub use transport::{EasReply, EasRequest, EasTransport, MockTransport, NetworkErrorKind, TransportError};

/// Sync key the server expects from a client with no prior state
pub const INITIAL_SYNC_KEY: &str = "0";

/// Whether `key` means "no sync state yet"
pub fn is_initial_key(key: Option<&str>) -> bool {
    match key {
        None => true,
        Some(k) => k.is_empty() || k == INITIAL_SYNC_KEY,
    }
}

/// A server document that does not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_keys() {
        assert!(is_initial_key(None));
        assert!(is_initial_key(Some("")));
        assert!(is_initial_key(Some("0")));
        assert!(!is_initial_key(Some("1")));
        assert!(!is_initial_key(Some("{5A3E}")));
    }
}
