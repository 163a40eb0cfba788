//! Sync engine for one ActiveSync account
//!
//! Every pass collects the server's deltas first and applies them to
//! storage only once the server reports the pass complete. The new sync
//! key is committed after the apply, so an interrupted pass is simply
//! replayed from the old key.

mod control;
mod folders;
mod messages;
mod moves;
mod send;
mod session;
mod settings;

pub use control::{CancelToken, SyncGuard, SyncLocks};
pub use folders::{FolderSyncStats, FolderSynchronizer};
pub use messages::{
    DownloadOutcome, EMAIL_WINDOW_SIZE, MAX_WINDOW_SIZE, MessageSynchronizer, SyncListener, SyncStats,
};
pub use send::send_message;
pub use session::Session;
pub use settings::check_server_settings;
