//! Error taxonomy surfaced at the backend boundary

use thiserror::Error;

use crate::protocol::NetworkErrorKind;

pub type EasResult<T> = std::result::Result<T, EasError>;

/// Classified failure of a backend operation
#[derive(Debug, Error)]
pub enum EasError {
    /// The server refused access for this account or device
    #[error("access denied by server")]
    AccessDenied,

    #[error("authentication failed")]
    AuthenticationFailed,

    /// Transient transport failure; callers may retry with backoff
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("unknown host: {0}")]
    UnknownHost(String),

    /// The server rejected a sync key again after the one-time full resync
    #[error("sync key rejected after full resync of {0}")]
    KeyInvalidated(String),

    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    /// The capability is not offered by ActiveSync; callers should hide it
    #[error("operation not supported by ActiveSync backend: {0}")]
    Unsupported(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("device provisioning required")]
    ProvisioningRequired,

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("sync already in progress for {0}")]
    SyncInProgress(String),

    #[error("sync cancelled")]
    Cancelled,

    #[error("server error: status {status}")]
    Server { status: u32 },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EasError {
    /// Whether a caller-driven retry with backoff may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EasError::Network { .. })
    }

    /// Whether the user has to fix credentials or account access
    pub fn is_auth_error(&self) -> bool {
        matches!(self, EasError::AccessDenied | EasError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        let network = EasError::Network {
            kind: NetworkErrorKind::Timeout,
            message: "read timed out".into(),
        };
        assert!(network.is_retryable());
        assert!(!EasError::AccessDenied.is_retryable());
        assert!(!EasError::MalformedResponse("bad".into()).is_retryable());
        assert!(!EasError::KeyInvalidated("inbox".into()).is_retryable());
        assert!(!EasError::Unsupported("search").is_retryable());
    }

    #[test]
    fn test_storage_errors_convert() {
        let err: EasError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, EasError::Storage(_)));
        assert_eq!(err.to_string(), "disk full");
    }
}
