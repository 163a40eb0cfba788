//! Classification of exchange outcomes

use super::transport::NetworkErrorKind;
use crate::error::EasError;

/// Terminal status of one protocol exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Ok,
    /// Server holds more deltas; re-invoke with the new key
    OkMoreAvailable,
    /// Server rejected the sync key; restart from the initial key
    KeyInvalid,
    Forbidden,
    AuthenticationFailed,
    NetworkError(NetworkErrorKind),
    MalformedResponse,
    /// Folder hierarchy changed underneath an item sync
    FolderSyncRequired,
    ProvisioningRequired,
    ServerError(u32),
}

impl OperationStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationStatus::Ok | OperationStatus::OkMoreAvailable)
    }

    /// Classify an HTTP status. Returns `None` for 200.
    pub fn from_http(status: u16) -> Option<Self> {
        match status {
            200 => None,
            401 => Some(OperationStatus::AuthenticationFailed),
            403 => Some(OperationStatus::Forbidden),
            449 => Some(OperationStatus::ProvisioningRequired),
            502..=504 => Some(OperationStatus::NetworkError(NetworkErrorKind::ServerUnavailable)),
            other => Some(OperationStatus::ServerError(u32::from(other))),
        }
    }

    /// Classify a status code shared by all commands (protocol 12.0+).
    /// Returns `None` for codes that are command specific.
    pub fn from_global_status(code: u32) -> Option<Self> {
        match code {
            // Server busy / retry later
            110 | 111 => Some(OperationStatus::NetworkError(NetworkErrorKind::ServerUnavailable)),
            // User or device blocked, account disabled, access denied
            126..=131 | 177 => Some(OperationStatus::Forbidden),
            // Remote wipe requested, device not provisioned, policy refresh,
            // invalid policy key
            140 | 142..=144 => Some(OperationStatus::ProvisioningRequired),
            _ => None,
        }
    }

    /// Global classification, falling back to a generic server error
    pub fn from_command_status(code: u32) -> Self {
        Self::from_global_status(code).unwrap_or(OperationStatus::ServerError(code))
    }

    /// The error this status surfaces as, or `None` for success.
    ///
    /// `subject` names what was being synced and ends up in key and
    /// malformed-response errors.
    pub fn error(&self, subject: &str) -> Option<EasError> {
        let err = match *self {
            OperationStatus::Ok | OperationStatus::OkMoreAvailable => return None,
            OperationStatus::KeyInvalid => EasError::KeyInvalidated(subject.to_string()),
            OperationStatus::Forbidden => EasError::AccessDenied,
            OperationStatus::AuthenticationFailed => EasError::AuthenticationFailed,
            OperationStatus::NetworkError(kind) => EasError::Network {
                kind,
                message: format!("while syncing {}", subject),
            },
            OperationStatus::MalformedResponse => EasError::MalformedResponse(subject.to_string()),
            OperationStatus::FolderSyncRequired => EasError::FolderNotFound(subject.to_string()),
            OperationStatus::ProvisioningRequired => EasError::ProvisioningRequired,
            OperationStatus::ServerError(status) => EasError::Server { status },
        };
        Some(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_classification() {
        assert_eq!(OperationStatus::from_http(200), None);
        assert_eq!(OperationStatus::from_http(401), Some(OperationStatus::AuthenticationFailed));
        assert_eq!(OperationStatus::from_http(403), Some(OperationStatus::Forbidden));
        assert_eq!(OperationStatus::from_http(449), Some(OperationStatus::ProvisioningRequired));
        assert_eq!(
            OperationStatus::from_http(503),
            Some(OperationStatus::NetworkError(NetworkErrorKind::ServerUnavailable))
        );
        assert_eq!(OperationStatus::from_http(500), Some(OperationStatus::ServerError(500)));
    }

    #[test]
    fn test_global_status_classification() {
        assert_eq!(OperationStatus::from_command_status(129), OperationStatus::Forbidden);
        assert_eq!(OperationStatus::from_command_status(142), OperationStatus::ProvisioningRequired);
        assert_eq!(OperationStatus::from_command_status(144), OperationStatus::ProvisioningRequired);
        assert_eq!(OperationStatus::from_command_status(2), OperationStatus::ServerError(2));
    }

    #[test]
    fn test_errors() {
        assert!(OperationStatus::Ok.error("inbox").is_none());
        assert!(OperationStatus::OkMoreAvailable.error("inbox").is_none());
        assert!(matches!(
            OperationStatus::Forbidden.error("inbox"),
            Some(EasError::AccessDenied)
        ));
        assert!(matches!(
            OperationStatus::KeyInvalid.error("inbox"),
            Some(EasError::KeyInvalidated(s)) if s == "inbox"
        ));
        assert!(
            OperationStatus::NetworkError(NetworkErrorKind::Timeout)
                .error("inbox")
                .unwrap()
                .is_retryable()
        );
    }
}
