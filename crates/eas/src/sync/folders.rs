//! Folder hierarchy synchronization

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::Instant;

use super::{CancelToken, Session, SyncLocks};
use crate::error::{EasError, EasResult};
use crate::models::{FolderRecord, FolderRole};
use crate::protocol::{FolderDelta, FolderDeltaBatch, OperationKind, OperationStatus, Payload};
use crate::storage::BackendStorageExt;

const SUBJECT: &str = "folder hierarchy";

/// Statistics from a folder sync pass
#[derive(Debug, Default, Clone)]
pub struct FolderSyncStats {
    /// Number of FolderSync round-trips
    pub rounds: u32,
    /// Number of folders created locally
    pub folders_added: usize,
    /// Number of folders renamed or re-roled
    pub folders_changed: usize,
    /// Number of folders deleted locally
    pub folders_removed: usize,
    /// Number of remote folders ignored because their type has no role
    pub folders_skipped: usize,
    /// Whether the pass started from the initial key and replaced everything
    pub reset: bool,
    /// Duration of the pass
    pub duration_ms: u64,
}

/// Drives FolderSync passes against one account
pub struct FolderSynchronizer<'a> {
    session: &'a Session,
}

impl<'a> FolderSynchronizer<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Boolean form of [`run_pass`](Self::run_pass)
    ///
    /// Access and authentication failures are raised; every other failed
    /// pass returns `Ok(false)`.
    pub fn sync_folders(&self, cancel: &CancelToken) -> EasResult<bool> {
        match self.run_pass(cancel) {
            Ok(_) => Ok(true),
            Err(e) if e.is_auth_error() || matches!(e, EasError::Cancelled | EasError::SyncInProgress(_)) => {
                Err(e)
            }
            Err(e) => {
                warn!("Folder sync failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Bring local folders up to date with the server
    ///
    /// Deltas from every round are applied once the server reports the
    /// pass complete; the new key is stored after that. A cancelled or
    /// failed pass leaves storage untouched.
    pub fn run_pass(&self, cancel: &CancelToken) -> EasResult<FolderSyncStats> {
        let _guard = self.session.locks().acquire(SyncLocks::FOLDERS)?;
        let start = Instant::now();
        let mut stats = FolderSyncStats::default();
        let storage = self.session.storage();
        let executor = self.session.executor();

        let stored_key = storage.folders_sync_key()?;
        let mut key = stored_key.clone();
        let mut batch = FolderDeltaBatch::default();
        let mut key_reset = false;
        let mut provisioned = false;

        // 1. Collect deltas until the server reports the pass complete
        loop {
            cancel.check()?;
            if stats.rounds >= self.session.max_rounds() {
                return Err(EasError::MalformedResponse(format!(
                    "folder sync did not finish within {} rounds",
                    stats.rounds
                )));
            }
            stats.rounds += 1;

            let account = self.session.account()?;
            let outcome = executor.perform(&OperationKind::FolderSync, &account, key.as_deref());
            cancel.check()?;

            match outcome.status {
                OperationStatus::Ok | OperationStatus::OkMoreAvailable => {
                    if let Payload::Folders(round) = outcome.payload {
                        batch.extend(round);
                    }
                    key = outcome.new_key;
                    if outcome.status == OperationStatus::Ok {
                        break;
                    }
                }
                OperationStatus::KeyInvalid if !key_reset => {
                    warn!("Folder sync key rejected; restarting from the initial key");
                    key_reset = true;
                    key = None;
                    batch = FolderDeltaBatch::default();
                }
                OperationStatus::ProvisioningRequired
                    if !provisioned && self.session.policy().should_provision() =>
                {
                    self.session.provision()?;
                    provisioned = true;
                }
                _ => {
                    return Err(outcome
                        .error(SUBJECT)
                        .unwrap_or_else(|| EasError::MalformedResponse(SUBJECT.into())));
                }
            }
        }

        // 2. Apply, then commit the key
        cancel.check()?;
        stats.reset = batch.reset;
        self.apply_batch(batch, &mut stats)?;
        if key != stored_key {
            storage.set_folders_sync_key(key.as_deref())?;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Folder sync: {} added, {} changed, {} removed, {} skipped in {} rounds",
            stats.folders_added,
            stats.folders_changed,
            stats.folders_removed,
            stats.folders_skipped,
            stats.rounds
        );
        Ok(stats)
    }

    /// Replay the batch over the current folder set and write the difference
    fn apply_batch(&self, batch: FolderDeltaBatch, stats: &mut FolderSyncStats) -> EasResult<()> {
        let storage = self.session.storage();
        let stored: BTreeMap<String, FolderRecord> = storage
            .get_folders()?
            .into_iter()
            .map(|folder| (folder.server_id.clone(), folder))
            .collect();

        // A reset batch describes the whole hierarchy; folders it still
        // names keep their messages and sync state
        let mut after = if batch.reset { BTreeMap::new() } else { stored.clone() };
        for delta in batch.deltas {
            apply_delta(&mut after, delta, stats);
        }

        let removed: Vec<String> = stored
            .keys()
            .filter(|id| !after.contains_key(*id))
            .cloned()
            .collect();
        let added: Vec<FolderRecord> = after
            .values()
            .filter(|folder| !stored.contains_key(&folder.server_id))
            .cloned()
            .collect();

        storage.delete_folders(&removed)?;
        storage.create_folders(&added)?;
        for folder in after.values() {
            let Some(old) = stored.get(&folder.server_id) else {
                continue;
            };
            if old == folder {
                continue;
            }
            if old.parent_server_id == folder.parent_server_id {
                storage.change_folder(&folder.server_id, &folder.display_name, folder.role)?;
            } else {
                storage.create_folders(std::slice::from_ref(folder))?;
            }
            stats.folders_changed += 1;
        }

        stats.folders_removed = removed.len();
        stats.folders_added = added.len();
        Ok(())
    }
}

fn apply_delta(folders: &mut BTreeMap<String, FolderRecord>, delta: FolderDelta, stats: &mut FolderSyncStats) {
    match delta {
        FolderDelta::Add {
            server_id,
            parent_id,
            display_name,
            type_code,
        } => match type_code.and_then(FolderRole::from_type_code) {
            Some(role) => {
                let record = FolderRecord::new(server_id.clone(), display_name, role).with_parent(parent_id);
                folders.insert(server_id, record);
            }
            None => {
                debug!("Skipping folder {} with unmapped type {:?}", server_id, type_code);
                stats.folders_skipped += 1;
            }
        },
        FolderDelta::Change {
            server_id,
            parent_id,
            display_name,
            type_code,
        } => match type_code.map(FolderRole::from_type_code) {
            Some(Some(role)) => {
                let record = FolderRecord::new(server_id.clone(), display_name, role).with_parent(parent_id);
                folders.insert(server_id, record);
            }
            Some(None) => {
                debug!("Ignoring change of folder {} to unmapped type {:?}", server_id, type_code);
            }
            // No type: rename in place, keep the role
            None => {
                if let Some(existing) = folders.get_mut(&server_id) {
                    let role = existing.role;
                    *existing = FolderRecord::new(server_id, display_name, role).with_parent(parent_id);
                }
            }
        },
        FolderDelta::Remove { server_id } => {
            folders.remove(&server_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::models::{AccountContext, ServerSettings, folder_type};
    use crate::policy::DefaultPolicyManager;
    use crate::protocol::folder_sync::response_document;
    use crate::protocol::{MockTransport, NetworkErrorKind, OperationExecutor};
    use crate::storage::{BackendStorage, InMemoryBackendStorage};
    use std::sync::Arc;

    fn add(id: &str, name: &str, type_code: u32) -> FolderDelta {
        FolderDelta::Add {
            server_id: id.into(),
            parent_id: None,
            display_name: name.into(),
            type_code: Some(type_code),
        }
    }

    fn change(id: &str, name: &str, type_code: Option<u32>) -> FolderDelta {
        FolderDelta::Change {
            server_id: id.into(),
            parent_id: None,
            display_name: name.into(),
            type_code,
        }
    }

    fn setup() -> (Arc<MockTransport>, Arc<InMemoryBackendStorage>, Session) {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(InMemoryBackendStorage::new());
        let session = Session::new(
            OperationExecutor::new(transport.clone(), ProtocolConfig::default()),
            storage.clone(),
            Arc::new(DefaultPolicyManager),
            AccountContext::new(
                "dev1",
                "bob@example.com",
                ServerSettings::new("mail.example.com", "bob", "pw"),
                "14.1",
            ),
        );
        (transport, storage, session)
    }

    #[test]
    fn test_apply_delta_last_delta_wins() {
        let mut folders = BTreeMap::new();
        let mut stats = FolderSyncStats::default();
        for delta in [
            add("5", "Projects", folder_type::USER_MAIL),
            change("5", "Projects 2024", Some(folder_type::USER_MAIL)),
            add("6", "Calendar", folder_type::CALENDAR),
            change("7", "Late arrival", Some(folder_type::SENT)),
            add("8", "Temp", folder_type::USER_GENERIC),
            FolderDelta::Remove { server_id: "8".into() },
        ] {
            apply_delta(&mut folders, delta, &mut stats);
        }

        assert_eq!(folders.keys().collect::<Vec<_>>(), vec!["5", "7"]);
        assert_eq!(folders["5"].display_name, "Projects 2024");
        assert_eq!(folders["7"].role, FolderRole::Sent);
        assert_eq!(stats.folders_skipped, 1);
    }

    #[test]
    fn test_change_to_unmapped_type_keeps_folder() {
        let mut folders = BTreeMap::new();
        let mut stats = FolderSyncStats::default();
        apply_delta(&mut folders, add("5", "Projects", folder_type::USER_MAIL), &mut stats);
        apply_delta(&mut folders, change("5", "Contacts", Some(folder_type::CONTACTS)), &mut stats);
        apply_delta(&mut folders, change("5", "Renamed", None), &mut stats);

        assert_eq!(folders["5"].display_name, "Renamed");
        assert_eq!(folders["5"].role, FolderRole::Regular);
    }

    #[test]
    fn test_pass_commits_key_after_apply() {
        let (transport, storage, session) = setup();
        transport.push_document(&response_document(
            1,
            Some("k1"),
            &[add("2", "Inbox", folder_type::INBOX), add("5", "Sent Items", folder_type::SENT)],
        ));

        let stats = FolderSynchronizer::new(&session).run_pass(&CancelToken::new()).unwrap();
        assert!(stats.reset);
        assert_eq!(stats.folders_added, 2);
        assert_eq!(storage.folders_sync_key().unwrap().as_deref(), Some("k1"));
        assert_eq!(storage.get_folder("5").unwrap().unwrap().role, FolderRole::Sent);
    }

    #[test]
    fn test_unchanged_key_not_rewritten() {
        let (transport, storage, session) = setup();
        storage.set_folders_sync_key(Some("k1")).unwrap();
        transport.push_document(&response_document(1, Some("k1"), &[]));

        let synchronizer = FolderSynchronizer::new(&session);
        assert!(synchronizer.sync_folders(&CancelToken::new()).unwrap());
        assert_eq!(storage.folders_sync_key().unwrap().as_deref(), Some("k1"));
    }

    #[test]
    fn test_forbidden_raises_access_denied() {
        let (transport, _storage, session) = setup();
        transport.push_http_status(403);

        let err = FolderSynchronizer::new(&session)
            .sync_folders(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, EasError::AccessDenied));
    }

    #[test]
    fn test_network_failure_returns_false() {
        let (transport, storage, session) = setup();
        storage.set_folders_sync_key(Some("k1")).unwrap();
        transport.push_error(NetworkErrorKind::Timeout);

        assert!(!FolderSynchronizer::new(&session).sync_folders(&CancelToken::new()).unwrap());
        assert_eq!(storage.folders_sync_key().unwrap().as_deref(), Some("k1"));
    }

    #[test]
    fn test_key_invalid_resyncs_once() {
        let (transport, storage, session) = setup();
        storage.set_folders_sync_key(Some("stale")).unwrap();
        storage
            .create_folders(&[FolderRecord::new("9", "Gone", FolderRole::Regular)])
            .unwrap();
        transport.push_document(&response_document(9, None, &[]));
        transport.push_document(&response_document(1, Some("k1"), &[add("2", "Inbox", folder_type::INBOX)]));

        let stats = FolderSynchronizer::new(&session).run_pass(&CancelToken::new()).unwrap();
        assert!(stats.reset);
        assert_eq!(storage.get_folder_server_ids().unwrap(), vec!["2"]);
        assert_eq!(storage.folders_sync_key().unwrap().as_deref(), Some("k1"));

        let second = transport.requests()[1].document().unwrap();
        assert_eq!(
            second.child_text(crate::protocol::tags::folder_hierarchy::SYNC_KEY),
            Some("0")
        );
    }

    #[test]
    fn test_second_key_invalid_fails() {
        let (transport, storage, session) = setup();
        storage.set_folders_sync_key(Some("stale")).unwrap();
        transport.push_document(&response_document(9, None, &[]));
        transport.push_document(&response_document(9, None, &[]));

        let err = FolderSynchronizer::new(&session).run_pass(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, EasError::KeyInvalidated(_)));
        assert_eq!(storage.folders_sync_key().unwrap().as_deref(), Some("stale"));
    }

    #[test]
    fn test_concurrent_pass_is_rejected() {
        let (_transport, _storage, session) = setup();
        let _held = session.locks().acquire(SyncLocks::FOLDERS).unwrap();

        let err = FolderSynchronizer::new(&session).run_pass(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, EasError::SyncInProgress(_)));
    }
}
