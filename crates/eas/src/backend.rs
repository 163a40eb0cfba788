//! Mail backend facade for the ActiveSync protocol
//!
//! [`Backend`] is the contract the controller layer programs against.
//! [`EasBackend`] implements it on top of the synchronizers; operations
//! ActiveSync has no equivalent for fail with [`EasError::Unsupported`]
//! so callers can hide the matching UI instead of showing an empty result.

use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{EasConfig, ProtocolConfig};
use crate::error::{EasError, EasResult};
use crate::models::{AccountContext, DeleteOutcome, Flag, MoveResult, OutgoingMessage, SyncWindow, SyncedMessage};
use crate::policy::PolicyManager;
use crate::protocol::{EasTransport, HttpTransport, OperationExecutor};
use crate::storage::BackendStorage;
use crate::sync::{
    self, CancelToken, DownloadOutcome, FolderSynchronizer, MessageSynchronizer, Session, SyncListener, SyncStats,
};

/// Fixed feature flags callers branch on to decide which actions to offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_seen_flag: bool,
    pub supports_expunge: bool,
    pub supports_move: bool,
    pub supports_copy: bool,
    pub supports_upload: bool,
    pub supports_trash_folder: bool,
    pub supports_search_by_date: bool,
    pub is_push_capable: bool,
    pub is_delete_move_to_trash: bool,
}

impl Capabilities {
    pub const EAS: Capabilities = Capabilities {
        supports_seen_flag: true,
        supports_expunge: false,
        supports_move: true,
        supports_copy: false,
        supports_upload: false,
        supports_trash_folder: true,
        supports_search_by_date: false,
        is_push_capable: false,
        is_delete_move_to_trash: true,
    };
}

/// Generic mail backend contract
///
/// All calls block on network I/O and are meant to run on a worker thread
/// owned by the caller.
pub trait Backend: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Bring the local folder list up to date. Returns false when the pass
    /// failed for a reason other than access or authentication.
    fn refresh_folder_list(&self, cancel: &CancelToken) -> EasResult<bool>;

    fn sync(&self, folder: &str, listener: &mut dyn SyncListener, cancel: &CancelToken) -> EasResult<SyncStats>;

    fn download_message(&self, folder: &str, server_id: &str, cancel: &CancelToken) -> EasResult<DownloadOutcome>;

    fn set_flag(
        &self,
        folder: &str,
        server_ids: &[String],
        flag: Flag,
        state: bool,
        cancel: &CancelToken,
    ) -> EasResult<()>;

    fn delete_messages(&self, folder: &str, server_ids: &[String], cancel: &CancelToken) -> EasResult<DeleteOutcome>;

    fn move_messages(&self, source: &str, target: &str, server_ids: &[String]) -> EasResult<MoveResult>;

    fn send_message(&self, message: &OutgoingMessage) -> EasResult<()>;

    fn check_incoming_server_settings(&self) -> EasResult<()>;

    fn check_outgoing_server_settings(&self) -> EasResult<()>;

    fn get_sync_window(&self, folder: &str) -> EasResult<SyncWindow>;

    fn set_sync_window(&self, folder: &str, window: SyncWindow) -> EasResult<()>;

    fn increase_sync_window(&self, folder: &str) -> EasResult<bool>;

    fn search(&self, folder: &str, query: &str) -> EasResult<Vec<String>>;

    fn copy_messages(&self, source: &str, target: &str, server_ids: &[String]) -> EasResult<HashMap<String, String>>;

    fn expunge(&self, folder: &str) -> EasResult<()>;

    fn expunge_messages(&self, folder: &str, server_ids: &[String]) -> EasResult<()>;

    fn fetch_message(&self, folder: &str, server_id: &str) -> EasResult<SyncedMessage>;

    fn fetch_part(&self, folder: &str, server_id: &str, part_id: &str) -> EasResult<Vec<u8>>;

    fn find_by_message_id(&self, folder: &str, message_id: &str) -> EasResult<Option<String>>;

    fn upload_message(&self, folder: &str, message: &OutgoingMessage) -> EasResult<String>;

    fn create_pusher(&self, folders: &[String]) -> EasResult<()>;

    fn mark_all_as_read(&self, folder: &str) -> EasResult<()>;

    fn delete_all_messages(&self, folder: &str) -> EasResult<()>;
}

/// ActiveSync implementation of [`Backend`] for one account
pub struct EasBackend {
    session: Session,
}

impl EasBackend {
    pub fn new(
        transport: Arc<dyn EasTransport>,
        storage: Arc<dyn BackendStorage>,
        policy: Arc<dyn PolicyManager>,
        account: AccountContext,
        config: ProtocolConfig,
    ) -> Self {
        let executor = OperationExecutor::new(transport, config);
        Self {
            session: Session::new(executor, storage, policy, account),
        }
    }

    /// Backend speaking HTTP to the server named in `config`
    pub fn from_config(
        config: &EasConfig,
        storage: Arc<dyn BackendStorage>,
        policy: Arc<dyn PolicyManager>,
    ) -> anyhow::Result<Self> {
        let account = config.account_context()?;
        let transport = Arc::new(HttpTransport::new(&config.protocol));
        Ok(Self::new(transport, storage, policy, account, config.protocol.clone()))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn messages(&self) -> MessageSynchronizer<'_> {
        MessageSynchronizer::new(&self.session)
    }

    fn check_server_settings(&self) -> EasResult<()> {
        sync::check_server_settings(self.session.executor(), &self.session.account()?)
    }
}

impl Backend for EasBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::EAS
    }

    fn refresh_folder_list(&self, cancel: &CancelToken) -> EasResult<bool> {
        FolderSynchronizer::new(&self.session).sync_folders(cancel)
    }

    fn sync(&self, folder: &str, listener: &mut dyn SyncListener, cancel: &CancelToken) -> EasResult<SyncStats> {
        listener.sync_started(folder);
        match self.messages().sync_folder(folder, listener, cancel) {
            Ok(stats) => {
                listener.sync_finished(folder, &stats);
                Ok(stats)
            }
            Err(e) => {
                warn!("Sync of {} failed: {}", folder, e);
                listener.sync_failed(folder, &e);
                Err(e)
            }
        }
    }

    fn download_message(&self, folder: &str, server_id: &str, cancel: &CancelToken) -> EasResult<DownloadOutcome> {
        self.messages().fully_download_message(folder, server_id, cancel)
    }

    fn set_flag(
        &self,
        folder: &str,
        server_ids: &[String],
        flag: Flag,
        state: bool,
        cancel: &CancelToken,
    ) -> EasResult<()> {
        self.messages().set_flag(folder, server_ids, flag, state, cancel)
    }

    fn delete_messages(&self, folder: &str, server_ids: &[String], cancel: &CancelToken) -> EasResult<DeleteOutcome> {
        self.messages().delete_messages(folder, server_ids, cancel)
    }

    fn move_messages(&self, source: &str, target: &str, server_ids: &[String]) -> EasResult<MoveResult> {
        self.messages().move_messages(source, target, server_ids)
    }

    fn send_message(&self, message: &OutgoingMessage) -> EasResult<()> {
        sync::send_message(&self.session, message)
    }

    fn check_incoming_server_settings(&self) -> EasResult<()> {
        self.check_server_settings()
    }

    // One transport serves both directions
    fn check_outgoing_server_settings(&self) -> EasResult<()> {
        self.check_server_settings()
    }

    fn get_sync_window(&self, folder: &str) -> EasResult<SyncWindow> {
        self.messages().get_sync_window(folder)
    }

    fn set_sync_window(&self, folder: &str, window: SyncWindow) -> EasResult<()> {
        info!("Setting sync window for {} to {:?}", folder, window);
        self.messages().set_sync_window(folder, window)
    }

    fn increase_sync_window(&self, folder: &str) -> EasResult<bool> {
        self.messages().increase_sync_window(folder)
    }

    fn search(&self, _folder: &str, _query: &str) -> EasResult<Vec<String>> {
        Err(EasError::Unsupported("search"))
    }

    fn copy_messages(&self, _source: &str, _target: &str, _server_ids: &[String]) -> EasResult<HashMap<String, String>> {
        Err(EasError::Unsupported("copy"))
    }

    fn expunge(&self, _folder: &str) -> EasResult<()> {
        Err(EasError::Unsupported("expunge"))
    }

    fn expunge_messages(&self, _folder: &str, _server_ids: &[String]) -> EasResult<()> {
        Err(EasError::Unsupported("expunge"))
    }

    fn fetch_message(&self, _folder: &str, _server_id: &str) -> EasResult<SyncedMessage> {
        Err(EasError::Unsupported("fetch message"))
    }

    fn fetch_part(&self, _folder: &str, _server_id: &str, _part_id: &str) -> EasResult<Vec<u8>> {
        Err(EasError::Unsupported("partial part fetch"))
    }

    fn find_by_message_id(&self, _folder: &str, _message_id: &str) -> EasResult<Option<String>> {
        Err(EasError::Unsupported("find by Message-ID"))
    }

    fn upload_message(&self, _folder: &str, _message: &OutgoingMessage) -> EasResult<String> {
        Err(EasError::Unsupported("message upload"))
    }

    fn create_pusher(&self, _folders: &[String]) -> EasResult<()> {
        Err(EasError::Unsupported("push"))
    }

    fn mark_all_as_read(&self, _folder: &str) -> EasResult<()> {
        Err(EasError::Unsupported("mark all as read"))
    }

    fn delete_all_messages(&self, _folder: &str) -> EasResult<()> {
        Err(EasError::Unsupported("delete all messages"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServerSettings;
    use crate::policy::DefaultPolicyManager;
    use crate::protocol::MockTransport;
    use crate::storage::InMemoryBackendStorage;

    fn backend(transport: Arc<MockTransport>) -> EasBackend {
        let account = AccountContext::new(
            "dev1",
            "bob@example.com",
            ServerSettings::new("mail.example.com", "bob", "pw"),
            "14.1",
        );
        EasBackend::new(
            transport,
            Arc::new(InMemoryBackendStorage::new()),
            Arc::new(DefaultPolicyManager),
            account,
            ProtocolConfig::default(),
        )
    }

    #[test]
    fn test_capabilities() {
        let caps = backend(Arc::new(MockTransport::new())).capabilities();
        assert!(caps.supports_seen_flag);
        assert!(caps.supports_move);
        assert!(caps.is_delete_move_to_trash);
        assert!(!caps.supports_expunge);
        assert!(!caps.supports_copy);
        assert!(!caps.supports_upload);
        assert!(!caps.is_push_capable);
    }

    #[test]
    fn test_unsupported_operations_send_nothing() {
        let transport = Arc::new(MockTransport::new());
        let backend = backend(transport.clone());
        let ids = vec!["m1".to_string()];

        assert!(matches!(backend.search("inbox", "q"), Err(EasError::Unsupported(_))));
        assert!(matches!(backend.copy_messages("a", "b", &ids), Err(EasError::Unsupported(_))));
        assert!(matches!(backend.expunge("inbox"), Err(EasError::Unsupported(_))));
        assert!(matches!(backend.fetch_part("inbox", "m1", "1.2"), Err(EasError::Unsupported(_))));
        assert!(matches!(backend.create_pusher(&ids), Err(EasError::Unsupported(_))));
        assert!(matches!(
            backend.upload_message("inbox", &OutgoingMessage::new(b"x".to_vec())),
            Err(EasError::Unsupported(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_sync_reports_failure_to_listener() {
        struct Recorder {
            failed: Vec<String>,
        }
        impl SyncListener for Recorder {
            fn message_downloaded(&mut self, _folder: &str, _message: &SyncedMessage) {}
            fn sync_failed(&mut self, folder: &str, _error: &EasError) {
                self.failed.push(folder.to_string());
            }
        }

        let backend = backend(Arc::new(MockTransport::new()));
        let mut recorder = Recorder { failed: Vec::new() };
        let result = backend.sync("missing", &mut recorder, &CancelToken::new());
        assert!(matches!(result, Err(EasError::FolderNotFound(_))));
        assert_eq!(recorder.failed, vec!["missing".to_string()]);
    }
}
