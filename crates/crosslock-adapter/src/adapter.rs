//! External call adapter: receives funds from the take-side ledger for
//! orders that carry an external call, and either runs the call right away
//! or keeps it for a later `execute_call` / `cancel_call`.
//!
//! ```text
//! DlnDestination ── funds + envelope ──▶ receive_call
//!                                           │
//!            reward beneficiary zero and ───┼─── otherwise
//!            delayed execution allowed      │
//!                     ▼                     ▼
//!              status = CREATED       run now: fee ▶ beneficiary
//!                     │                       call ok  ▶ target
//!     execute_call ◀──┴──▶ cancel_call        call err ▶ fallback
//! ```

use std::collections::HashMap;

use crosslock_orderlib::{ExternalCallEnvelope, derive_call_id, external_call_hash};
use crosslock_runtime::{AssetBook, CallContext};
use crosslock_types::{
    Address, Amount, CallId, CrosslockError, DlnEvent, EventLog, ExternalCallStatus, OrderId,
    Result,
};

use crate::executor::{CallTarget, ExternalCallExecutor, Invocation};

/// Funds and identity of one external call, as handed over by the
/// take-side ledger.
#[derive(Debug, Clone, Copy)]
pub struct CallFunds<'a> {
    pub order_id: OrderId,
    /// Only this address may cancel a registered call.
    pub call_authority: &'a Address,
    pub token: &'a Address,
    pub amount: Amount,
}

impl CallFunds<'_> {
    fn call_id(&self, external_call_hash: &[u8; 32]) -> CallId {
        derive_call_id(
            &self.order_id,
            self.call_authority,
            self.token,
            self.amount,
            external_call_hash,
        )
    }
}

/// Holds funds for pending external calls and runs them through an
/// [`ExternalCallExecutor`].
#[derive(Debug)]
pub struct ExternalCallAdapter {
    address: Address,
    admin: Address,
    dln_destination: Address,
    executor: ExternalCallExecutor,
    statuses: HashMap<CallId, ExternalCallStatus>,
    events: EventLog,
}

impl ExternalCallAdapter {
    /// Adapter at `address` that only accepts funds from `dln_destination`.
    #[must_use]
    pub fn new(
        address: Address,
        admin: Address,
        dln_destination: Address,
        executor: ExternalCallExecutor,
    ) -> Self {
        Self {
            address,
            admin,
            dln_destination,
            executor,
            statuses: HashMap::new(),
            events: EventLog::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn dln_destination(&self) -> &Address {
        &self.dln_destination
    }

    #[must_use]
    pub fn executor(&self) -> &ExternalCallExecutor {
        &self.executor
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Status of a call; [`ExternalCallStatus::Unset`] if never registered.
    #[must_use]
    pub fn call_status(&self, call_id: &CallId) -> ExternalCallStatus {
        self.statuses.get(call_id).copied().unwrap_or_default()
    }

    // -----------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------

    /// Accept funds for an order's external call. The take-side ledger has
    /// already moved `funds.amount` of `funds.token` to this adapter.
    ///
    /// A zero `reward_beneficiary` on an envelope that allows delayed
    /// execution registers the call. Any other combination runs it now;
    /// the execution fee goes to `reward_beneficiary` unless it is zero.
    /// A failed call is contained: its funds go to the fallback address.
    ///
    /// # Errors
    /// - [`CrosslockError::DlnBadRole`] unless called by the take-side ledger
    /// - [`CrosslockError::InvalidExternalCall`] for an undecodable envelope
    /// - [`CrosslockError::InvalidState`] if the call is already registered
    /// - [`CrosslockError::WrongArgument`] if the execution fee exceeds the amount
    pub fn receive_call(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        funds: CallFunds<'_>,
        external_call: &[u8],
        reward_beneficiary: &Address,
    ) -> Result<()> {
        if ctx.caller != self.dln_destination {
            return Err(CrosslockError::DlnBadRole);
        }
        let envelope = ExternalCallEnvelope::decode(external_call)?;

        if reward_beneficiary.is_zero() && envelope.allow_delayed_execution {
            let call_id = funds.call_id(&external_call_hash(external_call));
            if self.call_status(&call_id) != ExternalCallStatus::Unset {
                return Err(CrosslockError::InvalidState);
            }
            self.statuses.insert(call_id, ExternalCallStatus::Created);
            self.events.emit(DlnEvent::ExternalCallRegistered {
                call_id,
                order_id: funds.order_id,
                call_authority: funds.call_authority.clone(),
                token: funds.token.clone(),
                amount: funds.amount,
                external_call: external_call.to_vec(),
            });
            tracing::info!(
                call_id = %call_id.short(),
                order_id = %funds.order_id.short(),
                amount = funds.amount,
                "External call registered"
            );
            return Ok(());
        }

        let beneficiary = (!reward_beneficiary.is_zero()).then_some(reward_beneficiary);
        self.run(assets, &funds, &envelope, beneficiary, false)?;
        Ok(())
    }

    /// Run a registered call. Returns whether the payload succeeded.
    ///
    /// # Errors
    /// - [`CrosslockError::InvalidState`] unless the call is CREATED
    /// - [`CrosslockError::BadRole`] if the envelope names a different executor
    /// - [`CrosslockError::ExternalCallFailed`] when the payload fails and the
    ///   envelope requires success; the call stays CREATED
    pub fn execute_call(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        funds: CallFunds<'_>,
        external_call: &[u8],
        reward_beneficiary: &Address,
    ) -> Result<bool> {
        let call_id = funds.call_id(&external_call_hash(external_call));
        if self.call_status(&call_id) != ExternalCallStatus::Created {
            return Err(CrosslockError::InvalidState);
        }
        let envelope = ExternalCallEnvelope::decode(external_call)?;
        if let Some(executor) = envelope.executor_address.as_ref().filter(|a| !a.is_zero()) {
            if ctx.caller != *executor {
                return Err(CrosslockError::BadRole);
            }
        }

        let beneficiary = (!reward_beneficiary.is_zero()).then_some(reward_beneficiary);
        let succeeded = self.run(
            assets,
            &funds,
            &envelope,
            beneficiary,
            envelope.require_successful_execution,
        )?;
        self.statuses.insert(call_id, ExternalCallStatus::Executed);
        Ok(succeeded)
    }

    /// Cancel a registered call and hand its funds to `cancel_beneficiary`.
    ///
    /// # Errors
    /// [`CrosslockError::InvalidState`] unless the call is CREATED,
    /// [`CrosslockError::BadRole`] unless called by the call authority.
    pub fn cancel_call(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        funds: CallFunds<'_>,
        external_call_hash: &[u8; 32],
        cancel_beneficiary: &Address,
    ) -> Result<()> {
        let call_id = funds.call_id(external_call_hash);
        if self.call_status(&call_id) != ExternalCallStatus::Created {
            return Err(CrosslockError::InvalidState);
        }
        if ctx.caller != *funds.call_authority {
            return Err(CrosslockError::BadRole);
        }

        assets.transfer(&self.address, cancel_beneficiary, funds.token, funds.amount)?;
        self.statuses.insert(call_id, ExternalCallStatus::Cancelled);
        self.events.emit(DlnEvent::ExternalCallCancelled {
            call_id,
            order_id: funds.order_id,
            cancel_beneficiary: cancel_beneficiary.clone(),
            token: funds.token.clone(),
            amount: funds.amount,
        });
        tracing::info!(
            call_id = %call_id.short(),
            beneficiary = %cancel_beneficiary,
            amount = funds.amount,
            "External call cancelled"
        );
        Ok(())
    }

    // -----------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------

    /// Replace the executor. Targets registered on the old one are dropped.
    pub fn update_executor(
        &mut self,
        ctx: &CallContext,
        executor: ExternalCallExecutor,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        let old = self.executor.address().clone();
        let new = executor.address().clone();
        self.executor = executor;
        self.events.emit(DlnEvent::ExecutorUpdated { old, new });
        Ok(())
    }

    pub fn register_target(
        &mut self,
        ctx: &CallContext,
        address: Address,
        target: Box<dyn CallTarget>,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        self.executor.register_target(address, target);
        Ok(())
    }

    pub fn add_prohibited_selector(&mut self, ctx: &CallContext, selector: [u8; 4]) -> Result<()> {
        self.require_admin(ctx)?;
        self.executor.policy_mut().prohibit(selector);
        Ok(())
    }

    pub fn remove_prohibited_selector(
        &mut self,
        ctx: &CallContext,
        selector: [u8; 4],
    ) -> Result<()> {
        self.require_admin(ctx)?;
        self.executor.policy_mut().allow(selector);
        Ok(())
    }

    fn require_admin(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller == self.admin {
            Ok(())
        } else {
            Err(CrosslockError::AdminBadRole)
        }
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// Dispatch the payload and settle funds. With `require_success` a
    /// failed payload aborts before any funds move.
    fn run(
        &mut self,
        assets: &mut AssetBook,
        funds: &CallFunds<'_>,
        envelope: &ExternalCallEnvelope,
        reward_beneficiary: Option<&Address>,
        require_success: bool,
    ) -> Result<bool> {
        let fee = if reward_beneficiary.is_some() {
            envelope.execution_fee
        } else {
            0
        };
        let remainder = funds.amount.checked_sub(fee).ok_or_else(|| {
            CrosslockError::wrong_argument(format!(
                "execution fee {fee} exceeds amount {}",
                funds.amount
            ))
        })?;

        let invocation = Invocation {
            order_id: funds.order_id,
            token: funds.token,
            amount: remainder,
            gas_budget: envelope.payload.gas_budget,
            call_data: &envelope.payload.call_data,
        };
        let outcome = self.executor.execute(&envelope.payload.to, &invocation);
        if let Err(err) = &outcome {
            tracing::warn!(
                order_id = %funds.order_id.short(),
                target = %envelope.payload.to,
                error = %err,
                "External call failed"
            );
            if require_success {
                return Err(CrosslockError::ExternalCallFailed);
            }
        }
        let succeeded = outcome.is_ok();

        let adapter = self.address.clone();
        assets.atomically(|book| {
            if let Some(beneficiary) = reward_beneficiary {
                book.transfer(&adapter, beneficiary, funds.token, fee)?;
            }
            let recipient = if succeeded {
                &envelope.payload.to
            } else {
                &envelope.fallback_address
            };
            book.transfer(&adapter, recipient, funds.token, remainder)
        })?;

        self.events.emit(DlnEvent::ExternalCallExecuted {
            order_id: funds.order_id,
            call_succeeded: succeeded,
        });
        tracing::info!(
            order_id = %funds.order_id.short(),
            succeeded,
            fee,
            "External call executed"
        );
        Ok(succeeded)
    }
}
