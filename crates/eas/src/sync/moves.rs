//! Moving messages between folders with MoveItems

use log::{debug, info, warn};

use super::{MessageSynchronizer, SyncLocks};
use crate::error::{EasError, EasResult};
use crate::models::{ItemStatus, MoveResult};
use crate::protocol::{MessageMove, OperationStatus};

impl MessageSynchronizer<'_> {
    /// Move messages from `source` to `target`
    ///
    /// Confirmed moves are relocated locally under their new server id.
    /// Messages the server did not confirm stay where they are.
    pub fn move_messages(&self, source: &str, target: &str, server_ids: &[String]) -> EasResult<MoveResult> {
        let mut result = MoveResult::default();
        if source == target {
            return Err(EasError::InvalidArgument(format!("cannot move messages within folder {}", source)));
        }
        if server_ids.is_empty() {
            return Ok(result);
        }
        self.require_folder(source)?;
        self.require_folder(target)?;
        let _guard = self.session.locks().acquire(SyncLocks::folder(source))?;

        let items: Vec<MessageMove> = server_ids
            .iter()
            .map(|id| MessageMove {
                src_msg_id: id.clone(),
                src_folder_id: source.to_string(),
                dst_folder_id: target.to_string(),
            })
            .collect();
        let executor = self.session.executor();
        let responses = match self.session.exchange(|account| executor.move_items(account, &items))? {
            Ok(responses) => responses,
            Err(failure) if matches!(failure.status, OperationStatus::NetworkError(_)) => {
                warn!("MoveItems from {} failed: {}; all {} to retry", source, failure, server_ids.len());
                result.retry.extend(server_ids.iter().cloned());
                return Ok(result);
            }
            Err(failure) => return Err(failure.into_error("MoveItems")),
        };

        for id in server_ids {
            match responses.iter().find(|r| &r.src_msg_id == id) {
                Some(response) => match (response.item_status(), &response.dst_msg_id) {
                    (ItemStatus::Success, Some(new_id)) => result.record_moved(id.as_str(), new_id.as_str()),
                    (status, _) => {
                        debug!("Move of {} not confirmed: status {}", id, response.status);
                        result.record_failure(id.as_str(), status);
                    }
                },
                None => result.record_failure(id.as_str(), ItemStatus::Retry),
            }
        }

        self.relocate(source, target, &result)?;
        info!(
            "Moved {} messages from {} to {} ({} to retry, {} to revert)",
            result.moved.len(),
            source,
            target,
            result.retry.len(),
            result.revert.len()
        );
        Ok(result)
    }

    fn relocate(&self, source: &str, target: &str, result: &MoveResult) -> EasResult<()> {
        let storage = self.session.storage();
        let mut moved = Vec::with_capacity(result.moved.len());
        for (old_id, new_id) in &result.moved {
            if source == target && old_id == new_id {
                continue;
            }
            if let Some(stored) = storage.get_message(source, old_id)? {
                let mut message = stored.message;
                message.server_id = new_id.clone();
                storage.save_message(target, &message, stored.download_state)?;
            }
            moved.push(old_id.clone());
        }
        if !moved.is_empty() {
            storage.destroy_messages(source, &moved)?;
        }
        Ok(())
    }
}

