//! ActiveSync backend sync core
//!
//! This crate keeps a local mail store in step with an Exchange ActiveSync
//! server:
//! - Wire protocol: WBXML codec, command builders and parsers, and a
//!   classifying operation executor over a pluggable transport
//! - Folder and message synchronizers with commit-after-apply sync keys
//! - Storage trait with in-memory and SQLite implementations
//! - A mail backend facade with fixed capability flags
//!
//! Every call blocks on network I/O; the caller owns the worker thread
//! and any retry loop (see [`retry::with_retry`]).

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod protocol;
pub mod retry;
pub mod storage;
pub mod sync;

pub use backend::{Backend, Capabilities, EasBackend};
pub use config::{AccountSettings, EasConfig, ProtocolConfig};
pub use error::{EasError, EasResult};
pub use models::{
    AccountContext, DeleteOutcome, DownloadState, EmailAddress, Flag, FolderRecord, FolderRole, ItemStatus,
    MoveResult, OutgoingMessage, ServerSettings, StoredMessage, SyncWindow, SyncedMessage,
};
pub use policy::{DefaultPolicyManager, PolicyManager};
pub use protocol::{EasTransport, HttpTransport, MockTransport, NetworkErrorKind};
pub use retry::{RetryPolicy, with_retry};
pub use storage::{BackendStorage, BackendStorageExt, InMemoryBackendStorage, SqliteBackendStorage};
pub use sync::{CancelToken, DownloadOutcome, FolderSyncStats, SyncListener, SyncStats};
