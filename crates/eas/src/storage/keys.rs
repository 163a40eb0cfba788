//! Typed accessors for the sync state kept in storage extras

use anyhow::{Context, Result};

use super::BackendStorage;
use crate::models::SyncWindow;

/// Account extra holding the folder hierarchy sync key
pub const FOLDERS_SYNC_KEY: &str = "foldersSyncKey";
/// Account extra holding the provisioned policy key
pub const POLICY_KEY: &str = "policyKey";
/// Folder extra holding the message sync key
pub const SYNC_KEY: &str = "syncKey";
/// Folder extra holding the sync window code
pub const SYNC_WINDOW: &str = "syncWindow";
/// Folder extra set when older messages exist beyond the window
pub const MORE_MESSAGES: &str = "moreMessages";

/// Sync-key and window helpers for any [`BackendStorage`]
pub trait BackendStorageExt: BackendStorage {
    fn folders_sync_key(&self) -> Result<Option<String>> {
        self.get_extra_string(FOLDERS_SYNC_KEY)
    }

    fn set_folders_sync_key(&self, key: Option<&str>) -> Result<()> {
        self.set_extra_string(FOLDERS_SYNC_KEY, key)
    }

    fn policy_key(&self) -> Result<Option<String>> {
        self.get_extra_string(POLICY_KEY)
    }

    fn set_policy_key(&self, key: Option<&str>) -> Result<()> {
        self.set_extra_string(POLICY_KEY, key)
    }

    fn folder_sync_key(&self, folder: &str) -> Result<Option<String>> {
        self.get_folder_extra_string(folder, SYNC_KEY)
    }

    fn set_folder_sync_key(&self, folder: &str, key: Option<&str>) -> Result<()> {
        self.set_folder_extra_string(folder, SYNC_KEY, key)
    }

    /// Stored window, or `None` if never set or unparseable
    fn sync_window(&self, folder: &str) -> Result<Option<SyncWindow>> {
        let raw = self.get_folder_extra_string(folder, SYNC_WINDOW)?;
        Ok(raw
            .and_then(|s| s.parse::<u32>().ok())
            .and_then(SyncWindow::from_code))
    }

    fn set_sync_window(&self, folder: &str, window: SyncWindow) -> Result<()> {
        self.set_folder_extra_string(folder, SYNC_WINDOW, Some(&window.code().to_string()))
            .with_context(|| format!("Failed to store sync window for folder {}", folder))
    }

    /// Defaults to true until a window of All has been reached
    fn more_messages(&self, folder: &str) -> Result<bool> {
        Ok(self.get_folder_extra_string(folder, MORE_MESSAGES)?.as_deref() != Some("false"))
    }

    fn set_more_messages(&self, folder: &str, more: bool) -> Result<()> {
        self.set_folder_extra_string(folder, MORE_MESSAGES, Some(if more { "true" } else { "false" }))
    }
}

impl<T: BackendStorage + ?Sized> BackendStorageExt for T {}
