//! Per-message results of delete and move batches

use std::collections::HashMap;

/// What the caller should do with one message after a batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Server applied the change
    Success,
    /// Server could not apply it now; try again later
    Retry,
    /// Server refused it; undo the local change
    Revert,
}

/// Result of a delete batch. Every requested id lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub retry: Vec<String>,
    pub revert: Vec<String>,
}

impl DeleteOutcome {
    pub fn record(&mut self, server_id: impl Into<String>, status: ItemStatus) {
        let server_id = server_id.into();
        match status {
            ItemStatus::Success => self.deleted.push(server_id),
            ItemStatus::Retry => self.retry.push(server_id),
            ItemStatus::Revert => self.revert.push(server_id),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.retry.is_empty() && self.revert.is_empty()
    }
}

/// Result of a move batch.
///
/// `moved` only holds ids the server confirmed along with their new ids.
/// An id missing from `moved` is in an unknown state; it has not been
/// deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveResult {
    pub moved: HashMap<String, String>,
    pub retry: Vec<String>,
    pub revert: Vec<String>,
}

impl MoveResult {
    /// New server id of a moved message
    pub fn new_server_id(&self, old_server_id: &str) -> Option<&str> {
        self.moved.get(old_server_id).map(String::as_str)
    }

    pub fn record_moved(&mut self, old_server_id: impl Into<String>, new_server_id: impl Into<String>) {
        self.moved.insert(old_server_id.into(), new_server_id.into());
    }

    pub fn record_failure(&mut self, server_id: impl Into<String>, status: ItemStatus) {
        match status {
            ItemStatus::Revert => self.revert.push(server_id.into()),
            ItemStatus::Retry | ItemStatus::Success => self.retry.push(server_id.into()),
        }
    }
}
