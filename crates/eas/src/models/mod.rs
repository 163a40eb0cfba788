//! Domain models for the ActiveSync sync core

mod account;
mod folder;
mod message;
mod outcome;
mod sync_window;

pub use account::{AccountContext, AuthType, ConnectionSecurity, ServerSettings};
pub use folder::{FolderRecord, FolderRole, folder_type};
pub use message::{
    DownloadState, EmailAddress, Flag, MessageFlags, OutgoingMessage, StoredMessage, SyncedMessage,
};
pub use outcome::{DeleteOutcome, ItemStatus, MoveResult};
pub use sync_window::{SyncWindow, SyncWindowUnit};
