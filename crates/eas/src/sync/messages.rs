//! Per-folder message synchronization
//!
//! Every server interaction here is a Sync pass over one folder's key:
//! plain change sync, fetching full bodies, flag changes and deletes only
//! differ in the commands they carry.

use log::{debug, info, warn};
use std::time::Instant;

use super::{CancelToken, FolderSynchronizer, Session, SyncLocks};
use crate::error::{EasError, EasResult};
use crate::models::{
    DeleteOutcome, DownloadState, Flag, ItemStatus, SyncWindow, SyncedMessage,
};
use crate::protocol::item_sync::TRUNCATION_SIZE;
use crate::protocol::{
    ItemCommand, ItemDeltaBatch, ItemSyncRequest, MessageDelta, OperationKind, OperationStatus,
    Payload, ResponseKind, is_initial_key,
};
use crate::storage::BackendStorageExt;

/// Items requested per round
pub const EMAIL_WINDOW_SIZE: u32 = 10;
/// Largest window the pass grows to when the server stalls
pub const MAX_WINDOW_SIZE: u32 = 512;

const ITEM_STATUS_OK: u32 = 1;
const ITEM_STATUS_SERVER_ERROR: u32 = 5;
const ITEM_STATUS_CONFLICT: u32 = 7;
const ITEM_STATUS_NOT_FOUND: u32 = 8;
const ITEM_STATUS_RETRY: u32 = 16;

/// Receives progress from a folder sync
pub trait SyncListener {
    fn sync_started(&mut self, _folder: &str) {}

    /// A message body is now stored in full
    fn message_downloaded(&mut self, folder: &str, message: &SyncedMessage);

    fn sync_finished(&mut self, _folder: &str, _stats: &SyncStats) {}

    fn sync_failed(&mut self, _folder: &str, _error: &EasError) {}
}

impl<F: FnMut(&str, &SyncedMessage)> SyncListener for F {
    fn message_downloaded(&mut self, folder: &str, message: &SyncedMessage) {
        self(folder, message)
    }
}

/// Statistics from a message sync
#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    /// Number of Sync round-trips for the change pass
    pub rounds: u32,
    /// Number of messages added or replaced
    pub messages_added: usize,
    /// Number of messages deleted locally
    pub messages_removed: usize,
    /// Number of flag changes applied
    pub flags_changed: usize,
    /// Number of messages reported complete to the listener
    pub messages_downloaded: usize,
    /// Number of messages dropped because the server would not send them in full
    pub messages_discarded: usize,
    /// Number of messages still truncated after the sync
    pub partial_messages: usize,
    /// Number of full downloads that failed after the key was committed
    pub download_failures: usize,
    /// Whether the folder was resynced from the initial key
    pub reset: bool,
    /// Duration of the sync
    pub duration_ms: u64,
}

/// Result of [`MessageSynchronizer::fully_download_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Nothing to do; no request was sent
    AlreadyComplete,
    Downloaded(SyncedMessage),
    /// The server no longer has the message or kept truncating it; it was
    /// removed locally
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyMode {
    Sync,
    /// Truncated bodies are not acceptable
    FullDownload,
}

/// What one pass should ask the server for
struct PassRequest {
    get_changes: bool,
    truncation_size: Option<u32>,
    commands: Vec<ItemCommand>,
}

impl PassRequest {
    fn changes() -> Self {
        Self {
            get_changes: true,
            truncation_size: Some(TRUNCATION_SIZE),
            commands: Vec::new(),
        }
    }

    fn commands(commands: Vec<ItemCommand>) -> Self {
        Self {
            get_changes: false,
            truncation_size: Some(TRUNCATION_SIZE),
            commands,
        }
    }

    fn fetch(server_ids: &[String]) -> Self {
        Self {
            get_changes: false,
            truncation_size: None,
            commands: server_ids.iter().cloned().map(ItemCommand::Fetch).collect(),
        }
    }
}

/// Collected deltas of a pass, not yet applied
struct PassResult {
    batch: ItemDeltaBatch,
    /// Key in storage when the pass began
    stored_key: Option<String>,
    /// Key to commit once the batch is applied
    new_key: Option<String>,
    rounds: u32,
}

#[derive(Default)]
struct Applied {
    completed: Vec<SyncedMessage>,
    discarded: Vec<String>,
}

#[derive(Default)]
struct FetchReport {
    downloaded: Vec<SyncedMessage>,
    discarded: Vec<String>,
    /// Ids the server did not deliver, with its item status if any
    failed: Vec<(String, Option<u32>)>,
}

/// Drives Sync passes for the folders of one account
pub struct MessageSynchronizer<'a> {
    pub(super) session: &'a Session,
}

impl<'a> MessageSynchronizer<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Pull changes for `folder`, then complete any truncated bodies
    pub fn sync_folder(
        &self,
        folder: &str,
        listener: &mut dyn SyncListener,
        cancel: &CancelToken,
    ) -> EasResult<SyncStats> {
        let _guard = self.session.locks().acquire(SyncLocks::folder(folder))?;
        let start = Instant::now();
        let mut stats = SyncStats::default();
        let storage = self.session.storage();

        // 1. Collect deltas
        let pass = self.run_pass(folder, &PassRequest::changes(), cancel)?;
        stats.rounds = pass.rounds;

        // 2. Apply, commit, report
        let applied = self.apply_batch(folder, &pass.batch, ApplyMode::Sync, &mut stats)?;
        self.commit(folder, &pass)?;
        for message in &applied.completed {
            listener.message_downloaded(folder, message);
        }
        stats.messages_downloaded = applied.completed.len();

        // 3. Complete truncated bodies; failures here do not undo the pass
        self.download_partials(folder, listener, cancel, &mut stats);
        stats.partial_messages = storage.get_partially_downloaded_messages(folder)?.len();

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Synced folder {}: {} added, {} removed, {} flag changes, {} partial in {} rounds",
            folder,
            stats.messages_added,
            stats.messages_removed,
            stats.flags_changed,
            stats.partial_messages,
            stats.rounds
        );
        Ok(stats)
    }

    /// Fetch the complete body of a partially downloaded message
    ///
    /// Calling this for a message that is already complete sends nothing.
    pub fn fully_download_message(
        &self,
        folder: &str,
        server_id: &str,
        cancel: &CancelToken,
    ) -> EasResult<DownloadOutcome> {
        let _guard = self.session.locks().acquire(SyncLocks::folder(folder))?;
        let storage = self.session.storage();
        self.require_folder(folder)?;

        let stored = storage
            .get_message(folder, server_id)?
            .ok_or_else(|| EasError::InvalidArgument(format!("no message {} in folder {}", server_id, folder)))?;
        if stored.download_state == DownloadState::Complete {
            debug!("Message {} in {} already complete", server_id, folder);
            return Ok(DownloadOutcome::AlreadyComplete);
        }
        if is_initial_key(storage.folder_sync_key(folder)?.as_deref()) {
            return Err(EasError::InvalidArgument(format!(
                "folder {} has not been synced yet",
                folder
            )));
        }

        let mut report = self.fetch(folder, &[server_id.to_string()], cancel)?;
        if let Some(message) = report.downloaded.pop() {
            return Ok(DownloadOutcome::Downloaded(message));
        }
        if !report.discarded.is_empty() {
            return Ok(DownloadOutcome::Discarded);
        }
        match report.failed.first() {
            Some((_, Some(status))) => Err(EasError::Server { status: *status }),
            _ => Err(EasError::MalformedResponse(format!(
                "server did not return message {}",
                server_id
            ))),
        }
    }

    /// Set or clear a flag on messages
    ///
    /// Clearing DELETED is unsupported; setting it deletes the messages.
    /// Ids the server rejects keep their local flag state.
    pub fn set_flag(
        &self,
        folder: &str,
        server_ids: &[String],
        flag: Flag,
        state: bool,
        cancel: &CancelToken,
    ) -> EasResult<()> {
        match flag {
            Flag::Deleted if !state => return Err(EasError::Unsupported("clearing the deleted flag")),
            Flag::Deleted => {
                self.delete_messages(folder, server_ids, cancel)?;
                return Ok(());
            }
            Flag::Answered | Flag::Forwarded => {
                return Err(EasError::Unsupported("setting answered or forwarded flags"));
            }
            Flag::Seen | Flag::Flagged => {}
        }
        if server_ids.is_empty() {
            return Ok(());
        }

        let _guard = self.session.locks().acquire(SyncLocks::folder(folder))?;
        let storage = self.session.storage();
        let commands = server_ids
            .iter()
            .map(|id| ItemCommand::ChangeFlag {
                server_id: id.clone(),
                flag,
                state,
            })
            .collect();
        let pass = self.run_pass(folder, &PassRequest::commands(commands), cancel)?;

        let mut stats = SyncStats::default();
        self.apply_batch(folder, &pass.batch, ApplyMode::Sync, &mut stats)?;
        let mut rejected = 0;
        for id in server_ids {
            match pass.batch.response_status(id, ResponseKind::Change) {
                None | Some(ITEM_STATUS_OK) => {
                    storage.set_message_flag(folder, id, flag, state)?;
                }
                Some(status) => {
                    warn!("Server rejected {} change for {}: status {}", flag.as_str(), id, status);
                    rejected += 1;
                }
            }
        }
        self.commit(folder, &pass)?;

        debug!(
            "Set {}={} on {} messages in {} ({} rejected)",
            flag.as_str(),
            state,
            server_ids.len() - rejected,
            folder,
            rejected
        );
        Ok(())
    }

    /// Delete messages on the server and locally
    ///
    /// Each id ends up in exactly one list of the outcome. Only ids in
    /// `deleted` are removed from storage.
    pub fn delete_messages(
        &self,
        folder: &str,
        server_ids: &[String],
        cancel: &CancelToken,
    ) -> EasResult<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();
        if server_ids.is_empty() {
            return Ok(outcome);
        }

        let _guard = self.session.locks().acquire(SyncLocks::folder(folder))?;
        let commands = server_ids.iter().cloned().map(ItemCommand::Delete).collect();
        let pass = self.run_pass(folder, &PassRequest::commands(commands), cancel)?;

        let mut stats = SyncStats::default();
        self.apply_batch(folder, &pass.batch, ApplyMode::Sync, &mut stats)?;
        for id in server_ids {
            let status = pass.batch.response_status(id, ResponseKind::Delete);
            outcome.record(id.as_str(), delete_status(status));
        }
        self.session.storage().destroy_messages(folder, &outcome.deleted)?;
        self.commit(folder, &pass)?;

        info!(
            "Deleted {} messages in {} ({} to retry, {} to revert)",
            outcome.deleted.len(),
            folder,
            outcome.retry.len(),
            outcome.revert.len()
        );
        Ok(outcome)
    }

    /// Stored window for `folder`, OneWeek if never set
    pub fn get_sync_window(&self, folder: &str) -> EasResult<SyncWindow> {
        self.require_folder(folder)?;
        Ok(self.session.storage().sync_window(folder)?.unwrap_or_default())
    }

    pub fn set_sync_window(&self, folder: &str, window: SyncWindow) -> EasResult<()> {
        self.require_folder(folder)?;
        self.session.storage().set_sync_window(folder, window)?;
        Ok(())
    }

    /// Widen the window by one step ("download more")
    ///
    /// Returns false when the folder already syncs everything.
    pub fn increase_sync_window(&self, folder: &str) -> EasResult<bool> {
        let current = self.get_sync_window(folder)?;
        let Some(next) = current.next() else {
            return Ok(false);
        };
        let storage = self.session.storage();
        storage.set_sync_window(folder, next)?;
        if next == SyncWindow::All {
            storage.set_more_messages(folder, false)?;
        }
        info!("Sync window for {} increased to {:?}", folder, next);
        Ok(true)
    }

    /// Window sent to the server: the stored one, capped by policy
    fn effective_window(&self, folder: &str) -> EasResult<SyncWindow> {
        let max = self.session.policy().max_sync_window();
        Ok(self.get_sync_window(folder)?.capped_at(max))
    }

    pub(super) fn require_folder(&self, folder: &str) -> EasResult<()> {
        match self.session.storage().get_folder(folder)? {
            Some(_) => Ok(()),
            None => Err(EasError::FolderNotFound(folder.to_string())),
        }
    }

    /// Exchange rounds until the server reports the pass complete
    ///
    /// Nothing is written to storage here, except by a nested folder sync
    /// when the server reports the hierarchy changed.
    fn run_pass(&self, folder: &str, request: &PassRequest, cancel: &CancelToken) -> EasResult<PassResult> {
        let storage = self.session.storage();
        let executor = self.session.executor();
        self.require_folder(folder)?;
        let window = self.effective_window(folder)?;

        let mut stored_key = storage.folder_sync_key(folder)?;
        let mut key = stored_key.clone();
        let mut batch = ItemDeltaBatch::default();
        let mut pending = request.commands.clone();
        let mut window_size = EMAIL_WINDOW_SIZE;
        let mut rounds = 0;
        let mut key_reset = false;
        let mut provisioned = false;
        let mut hierarchy_refreshed = false;

        loop {
            cancel.check()?;
            if rounds >= self.session.max_rounds() {
                return Err(EasError::MalformedResponse(format!(
                    "sync of {} did not finish within {} rounds",
                    folder, rounds
                )));
            }
            rounds += 1;

            let initial = is_initial_key(key.as_deref());
            let sync = ItemSyncRequest {
                collection_id: folder.to_string(),
                window,
                window_size,
                get_changes: request.get_changes,
                deletes_as_moves: !pending.iter().any(|c| matches!(c, ItemCommand::Delete(_))),
                truncation_size: request.truncation_size,
                // The server only accepts commands against a real key
                commands: if initial { Vec::new() } else { pending.clone() },
            };
            let account = self.session.account()?;
            let outcome = executor.perform(&OperationKind::ItemSync(sync), &account, key.as_deref());
            cancel.check()?;

            match outcome.status {
                OperationStatus::Ok | OperationStatus::OkMoreAvailable => {
                    if !initial {
                        pending.clear();
                    }
                    if let Payload::Items(round) = outcome.payload {
                        batch.extend(round);
                    }
                    if outcome.status == OperationStatus::Ok {
                        key = outcome.new_key;
                        break;
                    }
                    if !initial && outcome.new_key == key {
                        window_size += EMAIL_WINDOW_SIZE;
                        if window_size > MAX_WINDOW_SIZE {
                            return Err(EasError::MalformedResponse(format!(
                                "server keeps {} stalled at window size {}",
                                folder, MAX_WINDOW_SIZE
                            )));
                        }
                        debug!("Key unchanged for {}; window size now {}", folder, window_size);
                    }
                    key = outcome.new_key;
                }
                OperationStatus::KeyInvalid if !key_reset => {
                    warn!("Sync key for {} rejected; resyncing folder from scratch", folder);
                    key_reset = true;
                    key = None;
                    batch = ItemDeltaBatch::default();
                    pending = request.commands.clone();
                    window_size = EMAIL_WINDOW_SIZE;
                }
                OperationStatus::FolderSyncRequired if !hierarchy_refreshed => {
                    info!("Folder hierarchy changed; refreshing before retrying {}", folder);
                    hierarchy_refreshed = true;
                    FolderSynchronizer::new(self.session).run_pass(cancel)?;
                    self.require_folder(folder)?;
                    stored_key = storage.folder_sync_key(folder)?;
                    key = stored_key.clone();
                    batch = ItemDeltaBatch::default();
                    pending = request.commands.clone();
                    window_size = EMAIL_WINDOW_SIZE;
                }
                OperationStatus::ProvisioningRequired
                    if !provisioned && self.session.policy().should_provision() =>
                {
                    self.session.provision()?;
                    provisioned = true;
                }
                _ => {
                    return Err(outcome
                        .error(folder)
                        .unwrap_or_else(|| EasError::MalformedResponse(folder.to_string())));
                }
            }
        }

        cancel.check()?;
        Ok(PassResult {
            batch,
            stored_key,
            new_key: key,
            rounds,
        })
    }

    fn apply_batch(
        &self,
        folder: &str,
        batch: &ItemDeltaBatch,
        mode: ApplyMode,
        stats: &mut SyncStats,
    ) -> EasResult<Applied> {
        let storage = self.session.storage();
        let mut applied = Applied::default();

        if batch.reset {
            storage.remove_all_messages(folder)?;
            stats.reset = true;
        }

        for delta in &batch.deltas {
            match delta {
                MessageDelta::Add(message) => {
                    let state = message.download_state();
                    if mode == ApplyMode::FullDownload && state == DownloadState::Partial {
                        warn!("Server sent {} truncated again; removing it", message.server_id);
                        storage.destroy_messages(folder, std::slice::from_ref(&message.server_id))?;
                        applied.discarded.push(message.server_id.clone());
                        stats.messages_discarded += 1;
                        continue;
                    }
                    storage.save_message(folder, message, state)?;
                    stats.messages_added += 1;
                    if state == DownloadState::Complete {
                        applied.completed.push(message.clone());
                    }
                }
                MessageDelta::ChangeFlag {
                    server_id,
                    flag,
                    state,
                } => {
                    if storage.set_message_flag(folder, server_id, *flag, *state)? {
                        stats.flags_changed += 1;
                    } else {
                        debug!("Flag change for unknown message {}", server_id);
                    }
                }
                MessageDelta::Delete { server_id } => {
                    storage.destroy_messages(folder, std::slice::from_ref(server_id))?;
                    stats.messages_removed += 1;
                }
            }
        }
        Ok(applied)
    }

    fn commit(&self, folder: &str, pass: &PassResult) -> EasResult<()> {
        if pass.new_key != pass.stored_key {
            self.session
                .storage()
                .set_folder_sync_key(folder, pass.new_key.as_deref())?;
        }
        Ok(())
    }

    /// Fetch full bodies for `server_ids`. The caller holds the folder lock.
    fn fetch(&self, folder: &str, server_ids: &[String], cancel: &CancelToken) -> EasResult<FetchReport> {
        let storage = self.session.storage();
        let pass = self.run_pass(folder, &PassRequest::fetch(server_ids), cancel)?;

        let mut stats = SyncStats::default();
        let applied = self.apply_batch(folder, &pass.batch, ApplyMode::FullDownload, &mut stats)?;
        let mut report = FetchReport {
            discarded: applied.discarded,
            ..FetchReport::default()
        };

        for id in server_ids {
            if report.discarded.contains(id) || applied.completed.iter().any(|m| &m.server_id == id) {
                continue;
            }
            match pass.batch.response_status(id, ResponseKind::Fetch) {
                Some(ITEM_STATUS_NOT_FOUND) => {
                    debug!("Message {} no longer exists on the server", id);
                    storage.destroy_messages(folder, std::slice::from_ref(id))?;
                    report.discarded.push(id.clone());
                }
                status => report.failed.push((id.clone(), status)),
            }
        }
        self.commit(folder, &pass)?;

        report.downloaded = applied.completed;
        Ok(report)
    }

    fn download_partials(
        &self,
        folder: &str,
        listener: &mut dyn SyncListener,
        cancel: &CancelToken,
        stats: &mut SyncStats,
    ) {
        let partial = match self.session.storage().get_partially_downloaded_messages(folder) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list partial messages in {}: {}", folder, e);
                stats.download_failures += 1;
                return;
            }
        };
        if partial.is_empty() {
            return;
        }

        match self.fetch(folder, &partial, cancel) {
            Ok(report) => {
                for message in &report.downloaded {
                    listener.message_downloaded(folder, message);
                }
                stats.messages_downloaded += report.downloaded.len();
                stats.messages_discarded += report.discarded.len();
                stats.download_failures += report.failed.len();
                for (id, status) in &report.failed {
                    warn!("Full download of {} in {} failed (status {:?})", id, folder, status);
                }
            }
            Err(e) => {
                warn!("Could not complete {} partial messages in {}: {}", partial.len(), folder, e);
                stats.download_failures += partial.len();
            }
        }
    }
}

/// Classify a per-item Delete status
fn delete_status(status: Option<u32>) -> ItemStatus {
    match status {
        // Absent means accepted; not-found means already gone
        None | Some(ITEM_STATUS_OK) | Some(ITEM_STATUS_NOT_FOUND) => ItemStatus::Success,
        Some(ITEM_STATUS_SERVER_ERROR) | Some(ITEM_STATUS_CONFLICT) | Some(ITEM_STATUS_RETRY) => {
            ItemStatus::Retry
        }
        Some(_) => ItemStatus::Revert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::models::{AccountContext, FolderRecord, FolderRole, ServerSettings};
    use crate::policy::DefaultPolicyManager;
    use crate::protocol::item_sync::response_document;
    use crate::protocol::tags::airsync;
    use crate::protocol::{MockTransport, OperationExecutor};
    use crate::storage::{BackendStorage, InMemoryBackendStorage};
    use std::sync::Arc;

    fn setup(key: Option<&str>) -> (Arc<MockTransport>, Arc<InMemoryBackendStorage>, Session) {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(InMemoryBackendStorage::new());
        storage
            .create_folders(&[FolderRecord::new("inbox", "Inbox", FolderRole::Inbox)])
            .unwrap();
        storage.set_folder_sync_key("inbox", key).unwrap();
        let account = AccountContext::new(
            "dev1",
            "bob@example.com",
            ServerSettings::new("mail.example.com", "bob", "pw"),
            "14.1",
        );
        let session = Session::new(
            OperationExecutor::new(transport.clone(), ProtocolConfig::default()),
            storage.clone(),
            Arc::new(DefaultPolicyManager),
            account,
        );
        (transport, storage, session)
    }

    fn sent_window_size(transport: &MockTransport, n: usize) -> Option<u32> {
        transport.requests()[n]
            .document()?
            .path(&[airsync::COLLECTIONS, airsync::COLLECTION])?
            .child_u32(airsync::WINDOW_SIZE)
    }

    #[test]
    fn test_stalled_key_grows_window() {
        let (transport, storage, session) = setup(Some("4"));
        transport.push_document(&response_document("inbox", 1, Some("4"), true, &[], &[]));
        transport.push_document(&response_document("inbox", 1, Some("4"), true, &[], &[]));
        transport.push_document(&response_document("inbox", 1, Some("5"), false, &[], &[]));

        let mut noop = |_: &str, _: &SyncedMessage| {};
        let stats = MessageSynchronizer::new(&session)
            .sync_folder("inbox", &mut noop, &CancelToken::new())
            .unwrap();

        assert_eq!(stats.rounds, 3);
        assert_eq!(sent_window_size(&transport, 0), Some(EMAIL_WINDOW_SIZE));
        assert_eq!(sent_window_size(&transport, 1), Some(2 * EMAIL_WINDOW_SIZE));
        assert_eq!(sent_window_size(&transport, 2), Some(3 * EMAIL_WINDOW_SIZE));
        assert_eq!(storage.folder_sync_key("inbox").unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn test_cancelled_before_first_round() {
        let (transport, storage, session) = setup(Some("4"));
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut noop = |_: &str, _: &SyncedMessage| {};
        let result = MessageSynchronizer::new(&session).sync_folder("inbox", &mut noop, &cancel);
        assert!(matches!(result, Err(EasError::Cancelled)));
        assert_eq!(transport.request_count(), 0);
        assert_eq!(storage.folder_sync_key("inbox").unwrap().as_deref(), Some("4"));
        assert!(!session.locks().is_held(&SyncLocks::folder("inbox")));
    }

    #[test]
    fn test_fully_download_requires_synced_folder() {
        let (transport, storage, session) = setup(None);
        storage
            .save_message("inbox", &SyncedMessage::new("m1").mime(b"x".to_vec(), true), DownloadState::Partial)
            .unwrap();

        let result = MessageSynchronizer::new(&session).fully_download_message("inbox", "m1", &CancelToken::new());
        assert!(matches!(result, Err(EasError::InvalidArgument(_))));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_answered_flag_unsupported() {
        let (transport, _storage, session) = setup(Some("4"));
        let result = MessageSynchronizer::new(&session).set_flag(
            "inbox",
            &["m1".to_string()],
            Flag::Answered,
            true,
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(EasError::Unsupported(_))));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_delete_status() {
        assert_eq!(delete_status(None), ItemStatus::Success);
        assert_eq!(delete_status(Some(1)), ItemStatus::Success);
        assert_eq!(delete_status(Some(8)), ItemStatus::Success);
        assert_eq!(delete_status(Some(5)), ItemStatus::Retry);
        assert_eq!(delete_status(Some(7)), ItemStatus::Retry);
        assert_eq!(delete_status(Some(16)), ItemStatus::Retry);
        assert_eq!(delete_status(Some(6)), ItemStatus::Revert);
    }

    #[test]
    fn test_fetch_request_has_no_truncation() {
        let request = PassRequest::fetch(&["m1".to_string()]);
        assert_eq!(request.truncation_size, None);
        assert!(!request.get_changes);
        assert_eq!(request.commands, vec![ItemCommand::Fetch("m1".into())]);
    }
}
