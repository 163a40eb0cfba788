//! Device policy hooks consulted by the sync core

use crate::models::SyncWindow;

/// Capability the host provides to gate provisioning and cap sync windows
///
/// Enforcing the downloaded policy (passwords, encryption) is the host's
/// business. The sync core only asks these two questions.
pub trait PolicyManager: Send + Sync {
    /// Largest window the account's policy permits
    fn max_sync_window(&self) -> SyncWindow;

    /// Whether the Provision handshake may run when the server demands it
    fn should_provision(&self) -> bool;
}

/// Permissive policy: no window cap, always provision
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyManager;

impl PolicyManager for DefaultPolicyManager {
    fn max_sync_window(&self) -> SyncWindow {
        SyncWindow::All
    }

    fn should_provision(&self) -> bool {
        true
    }
}
