//! Server settings check

use log::{debug, info};

use crate::error::{EasError, EasResult};
use crate::models::AccountContext;
use crate::protocol::{NetworkErrorKind, OperationExecutor, OperationKind, OperationStatus};

/// Verify host and credentials with a FolderSync from the initial key
///
/// Nothing is stored. A server that demands provisioning has accepted the
/// credentials, so that counts as success.
pub fn check_server_settings(executor: &OperationExecutor, account: &AccountContext) -> EasResult<()> {
    debug!("Checking server settings for {}", account.server.endpoint());
    let outcome = executor.perform(&OperationKind::FolderSync, account, None);
    match outcome.status {
        OperationStatus::Ok | OperationStatus::OkMoreAvailable | OperationStatus::ProvisioningRequired => {
            info!("Server settings for {} accepted", account.email_address);
            Ok(())
        }
        OperationStatus::AuthenticationFailed => Err(EasError::AuthenticationFailed),
        OperationStatus::Forbidden => Err(EasError::AccessDenied),
        OperationStatus::NetworkError(NetworkErrorKind::UnknownHost) => {
            Err(EasError::UnknownHost(account.server.host.clone()))
        }
        _ => Err(outcome
            .error("server settings check")
            .unwrap_or_else(|| EasError::MalformedResponse("server settings check".into()))),
    }
}
