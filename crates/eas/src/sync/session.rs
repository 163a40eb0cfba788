//! Shared context for every synchronizer of one account

use log::{info, warn};
use std::sync::Arc;

use super::SyncLocks;
use crate::error::{EasError, EasResult};
use crate::models::AccountContext;
use crate::policy::PolicyManager;
use crate::protocol::provision::{ProvisionResponse, STATUS_OK};
use crate::protocol::{ExchangeFailure, OperationExecutor, OperationStatus};
use crate::storage::{BackendStorage, BackendStorageExt};

/// Policy status meaning the server has no policy for this device
const POLICY_STATUS_NONE: u32 = 2;

/// Executor, storage and policy for one account
pub struct Session {
    executor: OperationExecutor,
    storage: Arc<dyn BackendStorage>,
    policy: Arc<dyn PolicyManager>,
    account: AccountContext,
    locks: SyncLocks,
}

impl Session {
    pub fn new(
        executor: OperationExecutor,
        storage: Arc<dyn BackendStorage>,
        policy: Arc<dyn PolicyManager>,
        account: AccountContext,
    ) -> Self {
        Self {
            executor,
            storage,
            policy,
            account,
            locks: SyncLocks::new(),
        }
    }

    pub fn executor(&self) -> &OperationExecutor {
        &self.executor
    }

    pub fn storage(&self) -> &dyn BackendStorage {
        self.storage.as_ref()
    }

    pub fn policy(&self) -> &dyn PolicyManager {
        self.policy.as_ref()
    }

    pub fn locks(&self) -> &SyncLocks {
        &self.locks
    }

    /// Account snapshot carrying the currently stored policy key
    pub fn account(&self) -> EasResult<AccountContext> {
        Ok(self.account.with_policy_key(self.storage.policy_key()?))
    }

    /// Account as configured, without any policy key
    pub fn base_account(&self) -> &AccountContext {
        &self.account
    }

    pub fn max_rounds(&self) -> u32 {
        self.executor.config().max_rounds
    }

    /// Run the two-step Provision handshake and store the final policy key
    ///
    /// A remote wipe directive clears all local account data and fails
    /// with `AccessDenied`.
    pub fn provision(&self) -> EasResult<()> {
        if !self.policy.should_provision() {
            return Err(EasError::ProvisioningRequired);
        }
        let account = self.account.with_policy_key(None);

        // 1. Fetch the policy and its temporary key
        let policy = self
            .executor
            .request_policy(&account)
            .map_err(|f| f.into_error("provisioning"))?;
        self.check_provision_response(&policy)?;
        if policy.policy_status == Some(POLICY_STATUS_NONE) {
            info!("No device policy for {}", self.account.email_address);
            self.storage.set_policy_key(None)?;
            return Ok(());
        }
        let temporary_key = policy
            .policy_key
            .ok_or_else(|| EasError::MalformedResponse("Provision response without PolicyKey".into()))?;

        // 2. Acknowledge it to receive the final key
        let ack = self
            .executor
            .acknowledge_policy(&account, &temporary_key)
            .map_err(|f| f.into_error("provisioning"))?;
        self.check_provision_response(&ack)?;
        let final_key = ack
            .policy_key
            .ok_or_else(|| EasError::MalformedResponse("Provision acknowledgement without PolicyKey".into()))?;

        self.storage.set_policy_key(Some(&final_key))?;
        info!("Provisioned device {} for {}", self.account.device_id, self.account.email_address);
        Ok(())
    }

    fn check_provision_response(&self, response: &ProvisionResponse) -> EasResult<()> {
        if response.remote_wipe {
            warn!(
                "Server requested remote wipe for {}; clearing local data",
                self.account.email_address
            );
            self.storage.wipe_account()?;
            return Err(EasError::AccessDenied);
        }
        if response.status != STATUS_OK {
            return Err(EasError::Server {
                status: response.status,
            });
        }
        Ok(())
    }

    /// Run a keyless exchange, provisioning once if the server asks for it
    ///
    /// The outer error is a provisioning or storage failure. The inner
    /// result is the exchange's own.
    pub fn exchange<T>(
        &self,
        mut op: impl FnMut(&AccountContext) -> Result<T, ExchangeFailure>,
    ) -> EasResult<Result<T, ExchangeFailure>> {
        let mut provisioned = false;
        loop {
            let account = self.account()?;
            match op(&account) {
                Err(failure)
                    if failure.status == OperationStatus::ProvisioningRequired
                        && !provisioned
                        && self.policy.should_provision() =>
                {
                    self.provision()?;
                    provisioned = true;
                }
                result => return Ok(result),
            }
        }
    }
}
