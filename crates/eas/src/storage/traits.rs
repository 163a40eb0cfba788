//! Storage trait definitions

use crate::models::{DownloadState, Flag, FolderRecord, FolderRole, StoredMessage, SyncedMessage};
use anyhow::Result;

/// Durable account state the sync core reads and writes
///
/// Implementations must be safe to call from the sync worker thread.
/// Batch operations are applied atomically: either every item lands or
/// none does.
pub trait BackendStorage: Send + Sync {
    /// Get an account-level extra value
    fn get_extra_string(&self, key: &str) -> Result<Option<String>>;

    /// Set an account-level extra value. `None` removes it.
    fn set_extra_string(&self, key: &str, value: Option<&str>) -> Result<()>;

    /// Insert folders, replacing any existing record with the same server id
    fn create_folders(&self, folders: &[FolderRecord]) -> Result<()>;

    /// Delete folders together with their messages and extras.
    /// Unknown ids are ignored.
    fn delete_folders(&self, server_ids: &[String]) -> Result<()>;

    /// Rename and re-role a folder. Does nothing if it does not exist.
    fn change_folder(&self, server_id: &str, display_name: &str, role: FolderRole) -> Result<()>;

    /// Server ids of every stored folder, sorted
    fn get_folder_server_ids(&self) -> Result<Vec<String>>;

    fn get_folder(&self, server_id: &str) -> Result<Option<FolderRecord>>;

    /// All folders, sorted by server id
    fn get_folders(&self) -> Result<Vec<FolderRecord>>;

    fn get_folder_extra_string(&self, folder: &str, key: &str) -> Result<Option<String>>;

    /// Set a folder extra. Fails if the folder does not exist.
    fn set_folder_extra_string(&self, folder: &str, key: &str, value: Option<&str>) -> Result<()>;

    /// Insert or replace a message
    fn save_message(&self, folder: &str, message: &SyncedMessage, state: DownloadState) -> Result<()>;

    fn get_message(&self, folder: &str, server_id: &str) -> Result<Option<StoredMessage>>;

    /// Server ids of the folder's messages, sorted
    fn get_message_server_ids(&self, folder: &str) -> Result<Vec<String>>;

    /// Remove messages. Unknown ids are ignored.
    fn destroy_messages(&self, folder: &str, server_ids: &[String]) -> Result<()>;

    /// Set one flag on a stored message. Returns false if the message
    /// is unknown.
    fn set_message_flag(&self, folder: &str, server_id: &str, flag: Flag, state: bool) -> Result<bool>;

    /// Server ids of messages whose body is still truncated, sorted
    fn get_partially_downloaded_messages(&self, folder: &str) -> Result<Vec<String>>;

    /// Remove every message of a folder, keeping the folder and its extras
    fn remove_all_messages(&self, folder: &str) -> Result<()>;

    /// Remove everything stored for the account
    fn wipe_account(&self) -> Result<()>;
}
