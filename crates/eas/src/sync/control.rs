//! Cancellation and single-flight guards for sync passes

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{EasError, EasResult};

/// Shared flag a caller sets to abandon a running pass
///
/// Clones share the flag. Passes check it between rounds and before
/// committing, so a cancelled pass never writes storage.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> EasResult<()> {
        if self.is_cancelled() {
            Err(EasError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Registry of sync keys currently being advanced
#[derive(Debug, Clone, Default)]
pub struct SyncLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl SyncLocks {
    /// Lock name for the folder hierarchy
    pub const FOLDERS: &'static str = "folders";

    pub fn new() -> Self {
        Self::default()
    }

    /// Lock name for a folder's message sync key
    pub fn folder(server_id: &str) -> String {
        format!("folder:{}", server_id)
    }

    /// Take `name`, failing with `SyncInProgress` if another pass holds it
    pub fn acquire(&self, name: impl Into<String>) -> EasResult<SyncGuard> {
        let name = name.into();
        if !self.held.lock().insert(name.clone()) {
            return Err(EasError::SyncInProgress(name));
        }
        Ok(SyncGuard {
            held: self.held.clone(),
            name,
        })
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

/// Releases its lock on drop
#[derive(Debug)]
pub struct SyncGuard {
    held: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(EasError::Cancelled)));
    }

    #[test]
    fn test_second_acquire_fails_until_release() {
        let locks = SyncLocks::new();
        let guard = locks.acquire(SyncLocks::folder("2")).unwrap();

        let err = locks.acquire(SyncLocks::folder("2")).unwrap_err();
        assert!(matches!(err, EasError::SyncInProgress(ref name) if name == "folder:2"));
        // Other keys are independent
        assert!(locks.acquire(SyncLocks::FOLDERS).is_ok());

        drop(guard);
        assert!(!locks.is_held("folder:2"));
        assert!(locks.acquire(SyncLocks::folder("2")).is_ok());
    }
}
