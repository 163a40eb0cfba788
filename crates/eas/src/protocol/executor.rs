//! Protocol operation executor
//!
//! Performs exactly one stateful exchange per call and classifies the
//! outcome. The executor never writes storage: it hands the new sync key
//! back so the caller can commit it after applying the deltas.

use log::{debug, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::folder_sync::{self, FolderDeltaBatch};
use super::item_sync::{self, ItemDeltaBatch, ItemSyncRequest};
use super::move_items::{self, MessageMove, MoveResponse};
use super::provision::{self, ProvisionResponse};
use super::send_mail;
use super::status::OperationStatus;
use super::tags::moves;
use super::transport::{EasRequest, EasTransport, RFC822_CONTENT_TYPE, WBXML_CONTENT_TYPE};
use super::wbxml::{self, Element};
use super::{INITIAL_SYNC_KEY, is_initial_key};
use crate::config::ProtocolConfig;
use crate::error::EasError;
use crate::models::{AccountContext, OutgoingMessage};

/// Keyed operations the executor can perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    FolderSync,
    ItemSync(ItemSyncRequest),
}

impl OperationKind {
    fn command(&self) -> &'static str {
        match self {
            OperationKind::FolderSync => "FolderSync",
            OperationKind::ItemSync(_) => "Sync",
        }
    }
}

/// Deltas carried by a successful exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    Folders(FolderDeltaBatch),
    Items(ItemDeltaBatch),
}

/// Result of [`OperationExecutor::perform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub status: OperationStatus,
    /// Key to commit once the payload has been applied
    pub new_key: Option<String>,
    pub payload: Payload,
    /// Human readable context for failures
    pub detail: Option<String>,
}

impl OperationOutcome {
    fn failed(status: OperationStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            new_key: None,
            payload: Payload::None,
            detail: Some(detail.into()),
        }
    }

    /// Error for a failed outcome, `None` when the status is ok
    pub fn error(&self, subject: &str) -> Option<EasError> {
        classified_error(self.status, self.detail.as_deref(), subject)
    }
}

/// A single exchange that did not produce a usable document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
    pub status: OperationStatus,
    pub detail: String,
}

impl ExchangeFailure {
    pub fn new(status: OperationStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn malformed(detail: impl Into<String>) -> Self {
        Self::new(OperationStatus::MalformedResponse, detail)
    }

    pub fn into_error(self, subject: &str) -> EasError {
        classified_error(self.status, Some(&self.detail), subject)
            .unwrap_or_else(|| EasError::MalformedResponse(self.detail))
    }
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.status, self.detail)
    }
}

impl From<ExchangeFailure> for OperationOutcome {
    fn from(failure: ExchangeFailure) -> Self {
        OperationOutcome::failed(failure.status, failure.detail)
    }
}

fn classified_error(status: OperationStatus, detail: Option<&str>, subject: &str) -> Option<EasError> {
    let err = status.error(subject)?;
    Some(match (err, detail) {
        (EasError::Network { kind, .. }, Some(detail)) => EasError::Network {
            kind,
            message: detail.to_string(),
        },
        (EasError::MalformedResponse(_), Some(detail)) => EasError::MalformedResponse(detail.to_string()),
        (err, _) => err,
    })
}

/// Runs protocol exchanges over a transport
pub struct OperationExecutor {
    transport: Arc<dyn EasTransport>,
    config: ProtocolConfig,
}

impl OperationExecutor {
    pub fn new(transport: Arc<dyn EasTransport>, config: ProtocolConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Perform one keyed exchange starting from `stored_key`
    ///
    /// A missing, empty or "0" key starts from the initial state; the
    /// payload then has `reset` set.
    pub fn perform(
        &self,
        kind: &OperationKind,
        account: &AccountContext,
        stored_key: Option<&str>,
    ) -> OperationOutcome {
        let initial = is_initial_key(stored_key);
        let key = match stored_key {
            Some(key) if !initial => key,
            _ => INITIAL_SYNC_KEY,
        };

        let outcome = match kind {
            OperationKind::FolderSync => self.folder_sync(account, key, initial),
            OperationKind::ItemSync(request) => self.item_sync(account, request, key, initial),
        };
        debug!(
            "{} from {} key: {:?} (new key {} chars)",
            kind.command(),
            if initial { "initial" } else { "stored" },
            outcome.status,
            outcome.new_key.as_deref().map_or(0, str::len)
        );
        outcome
    }

    fn folder_sync(&self, account: &AccountContext, key: &str, initial: bool) -> OperationOutcome {
        let timeout = if initial {
            self.config.initial_sync_timeout()
        } else {
            self.config.command_timeout()
        };
        let request = wbxml_request("FolderSync", &folder_sync::build_request(key), timeout);

        let root = match self.exchange(account, &request) {
            Ok(Some(root)) => root,
            Ok(None) => {
                return OperationOutcome::failed(OperationStatus::MalformedResponse, "empty FolderSync response");
            }
            Err(failure) => return failure.into(),
        };
        let response = match folder_sync::parse_response(&root) {
            Ok(response) => response,
            Err(e) => return OperationOutcome::failed(OperationStatus::MalformedResponse, e.to_string()),
        };

        let status = folder_sync::classify(response.status);
        if status != OperationStatus::Ok {
            return OperationOutcome::failed(status, format!("FolderSync status {}", response.status));
        }
        let Some(new_key) = response.sync_key else {
            return OperationOutcome::failed(OperationStatus::MalformedResponse, "FolderSync without SyncKey");
        };

        OperationOutcome {
            status,
            new_key: Some(new_key),
            payload: Payload::Folders(FolderDeltaBatch {
                reset: initial,
                deltas: response.deltas,
            }),
            detail: None,
        }
    }

    fn item_sync(
        &self,
        account: &AccountContext,
        sync: &ItemSyncRequest,
        key: &str,
        initial: bool,
    ) -> OperationOutcome {
        let request = wbxml_request(
            "Sync",
            &item_sync::build_request(sync, key, initial),
            self.config.command_timeout(),
        );

        let root = match self.exchange(account, &request) {
            Ok(Some(root)) => root,
            // No changes since `key`
            Ok(None) if !initial => {
                return OperationOutcome {
                    status: OperationStatus::Ok,
                    new_key: Some(key.to_string()),
                    payload: Payload::Items(ItemDeltaBatch::default()),
                    detail: None,
                };
            }
            Ok(None) => {
                return OperationOutcome::failed(
                    OperationStatus::MalformedResponse,
                    "empty Sync response to initial key",
                );
            }
            Err(failure) => return failure.into(),
        };
        let response = match item_sync::parse_response(&root, &sync.collection_id) {
            Ok(response) => response,
            Err(e) => return OperationOutcome::failed(OperationStatus::MalformedResponse, e.to_string()),
        };

        let status = item_sync::classify(response.status);
        if status != OperationStatus::Ok {
            return OperationOutcome::failed(
                status,
                format!("Sync status {} for collection {}", response.status, sync.collection_id),
            );
        }
        let new_key = match response.sync_key {
            Some(new_key) => new_key,
            None if !initial => key.to_string(),
            None => {
                return OperationOutcome::failed(OperationStatus::MalformedResponse, "Sync without SyncKey");
            }
        };

        // The initial exchange only hands out a key; data comes next round
        let more = response.more_available || initial;
        OperationOutcome {
            status: if more {
                OperationStatus::OkMoreAvailable
            } else {
                OperationStatus::Ok
            },
            new_key: Some(new_key),
            payload: Payload::Items(ItemDeltaBatch {
                reset: initial,
                deltas: response.deltas,
                responses: response.responses,
            }),
            detail: None,
        }
    }

    /// Stage moves on the server and return its per-item verdicts
    pub fn move_items(
        &self,
        account: &AccountContext,
        items: &[MessageMove],
    ) -> Result<Vec<MoveResponse>, ExchangeFailure> {
        let request = wbxml_request(
            "MoveItems",
            &move_items::build_request(items),
            self.config.command_timeout(),
        );
        let root = self
            .exchange(account, &request)?
            .ok_or_else(|| ExchangeFailure::malformed("empty MoveItems response"))?;

        if let Some(status) = root
            .child_u32(moves::STATUS)
            .and_then(OperationStatus::from_global_status)
        {
            return Err(ExchangeFailure::new(status, "MoveItems rejected"));
        }
        move_items::parse_response(&root).map_err(|e| ExchangeFailure::malformed(e.to_string()))
    }

    /// Submit an RFC 822 message for delivery
    pub fn send_mail(
        &self,
        account: &AccountContext,
        message: &OutgoingMessage,
        save_in_sent: bool,
    ) -> Result<(), ExchangeFailure> {
        if !account.uses_wbxml_send_mail() {
            let request = EasRequest {
                command: "SendMail",
                extra_query: if save_in_sent {
                    vec![("SaveInSent", "T".to_string())]
                } else {
                    Vec::new()
                },
                content_type: RFC822_CONTENT_TYPE,
                body: message.mime.clone(),
                timeout: self.config.command_timeout(),
            };
            self.exchange(account, &request)?;
            return Ok(());
        }

        let client_id = uuid::Uuid::new_v4().simple().to_string();
        let doc = send_mail::build_request(&client_id, &message.mime, save_in_sent);
        let request = wbxml_request("SendMail", &doc, self.config.command_timeout());
        let root = self.exchange(account, &request)?;
        match send_mail::parse_status(root.as_ref()) {
            Ok(None) | Ok(Some(1)) => Ok(()),
            Ok(Some(code)) => Err(ExchangeFailure::new(
                OperationStatus::from_command_status(code),
                format!("SendMail status {}", code),
            )),
            Err(e) => Err(ExchangeFailure::malformed(e.to_string())),
        }
    }

    /// First Provision leg: fetch the policy and its temporary key
    pub fn request_policy(&self, account: &AccountContext) -> Result<ProvisionResponse, ExchangeFailure> {
        self.provision_exchange(account, &provision::build_policy_request())
    }

    /// Second Provision leg: acknowledge the temporary key
    pub fn acknowledge_policy(
        &self,
        account: &AccountContext,
        temporary_key: &str,
    ) -> Result<ProvisionResponse, ExchangeFailure> {
        self.provision_exchange(
            account,
            &provision::build_acknowledgement(temporary_key, provision::STATUS_OK),
        )
    }

    fn provision_exchange(
        &self,
        account: &AccountContext,
        doc: &Element,
    ) -> Result<ProvisionResponse, ExchangeFailure> {
        let request = wbxml_request("Provision", doc, self.config.command_timeout());
        let root = self
            .exchange(account, &request)?
            .ok_or_else(|| ExchangeFailure::malformed("empty Provision response"))?;
        provision::parse_response(&root).map_err(|e| ExchangeFailure::malformed(e.to_string()))
    }

    /// POST one request and decode the body. Transport failures, HTTP
    /// errors and undecodable bodies come back classified.
    fn exchange(
        &self,
        account: &AccountContext,
        request: &EasRequest,
    ) -> Result<Option<Element>, ExchangeFailure> {
        let reply = self.transport.post(account, request).map_err(|e| {
            warn!("{} to {} failed: {}", request.command, account.server.host, e);
            ExchangeFailure::new(OperationStatus::NetworkError(e.kind), e.to_string())
        })?;

        if let Some(status) = OperationStatus::from_http(reply.status) {
            debug!("{} returned HTTP {}", request.command, reply.status);
            return Err(ExchangeFailure::new(
                status,
                format!("HTTP {} for {}", reply.status, request.command),
            ));
        }
        if reply.body.is_empty() {
            return Ok(None);
        }
        wbxml::decode(&reply.body)
            .map(Some)
            .map_err(|e| ExchangeFailure::malformed(format!("{} response: {}", request.command, e)))
    }
}

fn wbxml_request(command: &'static str, doc: &Element, timeout: Duration) -> EasRequest {
    EasRequest {
        command,
        extra_query: Vec::new(),
        content_type: WBXML_CONTENT_TYPE,
        body: wbxml::encode(doc),
        timeout,
    }
}
