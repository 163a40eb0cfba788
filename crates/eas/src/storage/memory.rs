//! In-memory storage implementation
//!
//! Used by tests and by the settings check. Every operation takes the
//! write lock once, so batch operations are atomic with respect to other
//! callers.

use anyhow::{Result, bail};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use super::BackendStorage;
use crate::models::{DownloadState, Flag, FolderRecord, FolderRole, StoredMessage, SyncedMessage};

struct StoredEntry {
    message: SyncedMessage,
    state: DownloadState,
}

struct FolderState {
    record: FolderRecord,
    extras: HashMap<String, String>,
    messages: BTreeMap<String, StoredEntry>,
}

impl FolderState {
    fn new(record: FolderRecord) -> Self {
        Self {
            record,
            extras: HashMap::new(),
            messages: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
struct Inner {
    extras: HashMap<String, String>,
    folders: BTreeMap<String, FolderState>,
}

/// In-memory implementation of [`BackendStorage`]
#[derive(Default)]
pub struct InMemoryBackendStorage {
    inner: RwLock<Inner>,
}

impl InMemoryBackendStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages across all folders
    pub fn message_count(&self) -> usize {
        self.inner.read().folders.values().map(|f| f.messages.len()).sum()
    }
}

impl BackendStorage for InMemoryBackendStorage {
    fn get_extra_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().extras.get(key).cloned())
    }

    fn set_extra_string(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut inner = self.inner.write();
        match value {
            Some(value) => inner.extras.insert(key.to_string(), value.to_string()),
            None => inner.extras.remove(key),
        };
        Ok(())
    }

    fn create_folders(&self, folders: &[FolderRecord]) -> Result<()> {
        let mut inner = self.inner.write();
        for record in folders {
            inner
                .folders
                .entry(record.server_id.clone())
                .and_modify(|existing| existing.record = record.clone())
                .or_insert_with(|| FolderState::new(record.clone()));
        }
        Ok(())
    }

    fn delete_folders(&self, server_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write();
        for id in server_ids {
            inner.folders.remove(id);
        }
        Ok(())
    }

    fn change_folder(&self, server_id: &str, display_name: &str, role: FolderRole) -> Result<()> {
        if let Some(folder) = self.inner.write().folders.get_mut(server_id) {
            folder.record.display_name = display_name.to_string();
            folder.record.role = role;
        }
        Ok(())
    }

    fn get_folder_server_ids(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().folders.keys().cloned().collect())
    }

    fn get_folder(&self, server_id: &str) -> Result<Option<FolderRecord>> {
        Ok(self.inner.read().folders.get(server_id).map(|f| f.record.clone()))
    }

    fn get_folders(&self) -> Result<Vec<FolderRecord>> {
        Ok(self.inner.read().folders.values().map(|f| f.record.clone()).collect())
    }

    fn get_folder_extra_string(&self, folder: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .read()
            .folders
            .get(folder)
            .and_then(|f| f.extras.get(key).cloned()))
    }

    fn set_folder_extra_string(&self, folder: &str, key: &str, value: Option<&str>) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(state) = inner.folders.get_mut(folder) else {
            bail!("Unknown folder {}", folder);
        };
        match value {
            Some(value) => state.extras.insert(key.to_string(), value.to_string()),
            None => state.extras.remove(key),
        };
        Ok(())
    }

    fn save_message(&self, folder: &str, message: &SyncedMessage, state: DownloadState) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(folder_state) = inner.folders.get_mut(folder) else {
            bail!("Unknown folder {}", folder);
        };
        folder_state.messages.insert(
            message.server_id.clone(),
            StoredEntry {
                message: message.clone(),
                state,
            },
        );
        Ok(())
    }

    fn get_message(&self, folder: &str, server_id: &str) -> Result<Option<StoredMessage>> {
        let inner = self.inner.read();
        Ok(inner
            .folders
            .get(folder)
            .and_then(|f| f.messages.get(server_id))
            .map(|entry| StoredMessage {
                folder_server_id: folder.to_string(),
                message: entry.message.clone(),
                download_state: entry.state,
            }))
    }

    fn get_message_server_ids(&self, folder: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .folders
            .get(folder)
            .map(|f| f.messages.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn destroy_messages(&self, folder: &str, server_ids: &[String]) -> Result<()> {
        if let Some(state) = self.inner.write().folders.get_mut(folder) {
            for id in server_ids {
                state.messages.remove(id);
            }
        }
        Ok(())
    }

    fn set_message_flag(&self, folder: &str, server_id: &str, flag: Flag, state: bool) -> Result<bool> {
        let mut inner = self.inner.write();
        let entry = inner
            .folders
            .get_mut(folder)
            .and_then(|f| f.messages.get_mut(server_id));
        Ok(match entry {
            Some(entry) => {
                entry.message.flags.set(flag, state);
                true
            }
            None => false,
        })
    }

    fn get_partially_downloaded_messages(&self, folder: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .folders
            .get(folder)
            .map(|f| {
                f.messages
                    .iter()
                    .filter(|(_, entry)| entry.state == DownloadState::Partial)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn remove_all_messages(&self, folder: &str) -> Result<()> {
        if let Some(state) = self.inner.write().folders.get_mut(folder) {
            state.messages.clear();
        }
        Ok(())
    }

    fn wipe_account(&self) -> Result<()> {
        *self.inner.write() = Inner::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BackendStorageExt;

    fn inbox() -> FolderRecord {
        FolderRecord::new("2", "Inbox", FolderRole::Inbox)
    }

    #[test]
    fn test_folder_upsert_and_delete() {
        let store = InMemoryBackendStorage::new();
        store.create_folders(&[inbox()]).unwrap();
        store
            .create_folders(&[FolderRecord::new("2", "Posteingang", FolderRole::Inbox)])
            .unwrap();

        assert_eq!(store.get_folder_server_ids().unwrap(), vec!["2"]);
        assert_eq!(store.get_folder("2").unwrap().unwrap().display_name, "Posteingang");

        store.delete_folders(&["2".into(), "missing".into()]).unwrap();
        assert!(store.get_folders().unwrap().is_empty());
    }

    #[test]
    fn test_change_missing_folder_is_noop() {
        let store = InMemoryBackendStorage::new();
        store.change_folder("9", "Nope", FolderRole::Regular).unwrap();
        assert!(store.get_folder("9").unwrap().is_none());
    }

    #[test]
    fn test_folder_extras_require_folder() {
        let store = InMemoryBackendStorage::new();
        assert!(store.set_folder_sync_key("2", Some("k1")).is_err());

        store.create_folders(&[inbox()]).unwrap();
        store.set_folder_sync_key("2", Some("k1")).unwrap();
        assert_eq!(store.folder_sync_key("2").unwrap().as_deref(), Some("k1"));

        // Deleting the folder drops its extras
        store.delete_folders(&["2".into()]).unwrap();
        store.create_folders(&[inbox()]).unwrap();
        assert_eq!(store.folder_sync_key("2").unwrap(), None);
    }

    #[test]
    fn test_messages_and_partial_tracking() {
        let store = InMemoryBackendStorage::new();
        store.create_folders(&[inbox()]).unwrap();

        let partial = SyncedMessage::new("m1").mime(b"Subject: a".to_vec(), true);
        let complete = SyncedMessage::new("m2").mime(b"Subject: b".to_vec(), false);
        store.save_message("2", &partial, partial.download_state()).unwrap();
        store.save_message("2", &complete, complete.download_state()).unwrap();

        assert_eq!(store.get_partially_downloaded_messages("2").unwrap(), vec!["m1"]);
        assert!(store.set_message_flag("2", "m2", Flag::Seen, true).unwrap());
        assert!(!store.set_message_flag("2", "m9", Flag::Seen, true).unwrap());
        assert!(store.get_message("2", "m2").unwrap().unwrap().message.flags.seen);

        store.destroy_messages("2", &["m1".into()]).unwrap();
        assert_eq!(store.get_message_server_ids("2").unwrap(), vec!["m2"]);

        store.remove_all_messages("2").unwrap();
        assert_eq!(store.message_count(), 0);
        assert!(store.get_folder("2").unwrap().is_some());
    }

    #[test]
    fn test_window_and_more_messages_defaults() {
        let store = InMemoryBackendStorage::new();
        store.create_folders(&[inbox()]).unwrap();

        assert_eq!(store.sync_window("2").unwrap(), None);
        assert!(store.more_messages("2").unwrap());

        store.set_sync_window("2", crate::models::SyncWindow::TwoWeeks).unwrap();
        store.set_more_messages("2", false).unwrap();
        assert_eq!(store.sync_window("2").unwrap(), Some(crate::models::SyncWindow::TwoWeeks));
        assert!(!store.more_messages("2").unwrap());
    }

    #[test]
    fn test_wipe_account() {
        let store = InMemoryBackendStorage::new();
        store.set_policy_key(Some("p1")).unwrap();
        store.create_folders(&[inbox()]).unwrap();

        store.wipe_account().unwrap();
        assert_eq!(store.policy_key().unwrap(), None);
        assert!(store.get_folder_server_ids().unwrap().is_empty());
    }
}
