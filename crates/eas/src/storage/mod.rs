//! Storage traits and implementations
//!
//! [`BackendStorage`] is the narrow contract the sync core persists
//! through. [`BackendStorageExt`] layers the named sync-state keys on top.

mod keys;
mod memory;
mod sqlite;
mod traits;

pub use keys::{
    BackendStorageExt, FOLDERS_SYNC_KEY, MORE_MESSAGES, POLICY_KEY, SYNC_KEY, SYNC_WINDOW,
};
pub use memory::InMemoryBackendStorage;
pub use sqlite::SqliteBackendStorage;
pub use traits::BackendStorage;
