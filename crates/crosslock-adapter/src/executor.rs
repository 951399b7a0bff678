//! Executor: runs an external call payload against a registered target.
//!
//! Targets stand in for contracts on the take chain. The executor refuses
//! prohibited selectors before dispatching and never lets a target failure
//! escape as a panic; the adapter decides where funds go from the
//! returned result.

use std::collections::HashMap;
use std::fmt;

use crosslock_types::{Address, Amount, CrosslockError, OrderId, Result};

use crate::selector::SelectorPolicy;

/// What a target sees when it is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub order_id: OrderId,
    pub token: &'a Address,
    /// Amount forwarded to the target if the call succeeds.
    pub amount: Amount,
    pub gas_budget: u32,
    pub call_data: &'a [u8],
}

/// A callable contract on the take chain.
pub trait CallTarget {
    /// Run the call. An `Err` means the call reverted.
    fn call(&mut self, invocation: &Invocation<'_>) -> Result<()>;
}

/// Dispatches payloads to registered targets behind a [`SelectorPolicy`].
pub struct ExternalCallExecutor {
    address: Address,
    policy: SelectorPolicy,
    targets: HashMap<Address, Box<dyn CallTarget>>,
}

impl ExternalCallExecutor {
    /// Executor with the default selector blocklist.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self::with_policy(address, SelectorPolicy::default())
    }

    #[must_use]
    pub fn with_policy(address: Address, policy: SelectorPolicy) -> Self {
        Self {
            address,
            policy,
            targets: HashMap::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn policy(&self) -> &SelectorPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut SelectorPolicy {
        &mut self.policy
    }

    /// Register (or replace) the target living at `address`.
    pub fn register_target(&mut self, address: Address, target: Box<dyn CallTarget>) {
        self.targets.insert(address, target);
    }

    #[must_use]
    pub fn has_target(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }

    /// Run `invocation` against the target at `to`.
    ///
    /// # Errors
    /// Selector policy violations, [`CrosslockError::TargetNotRegistered`],
    /// or the target's own revert.
    pub fn execute(&mut self, to: &Address, invocation: &Invocation<'_>) -> Result<()> {
        self.policy.check(invocation.call_data)?;
        let target = self
            .targets
            .get_mut(to)
            .ok_or_else(|| CrosslockError::TargetNotRegistered(to.to_string()))?;
        target.call(invocation)
    }
}

impl fmt::Debug for ExternalCallExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalCallExecutor")
            .field("address", &self.address)
            .field("policy", &self.policy)
            .field("targets", &self.targets.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-helpers"))]
pub use recording::{RecordedCall, RecordingTarget};

#[cfg(any(test, feature = "test-helpers"))]
mod recording {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{CallTarget, Invocation};
    use crosslock_types::{Address, Amount, CrosslockError, OrderId, Result};

    /// A call seen by a [`RecordingTarget`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub order_id: OrderId,
        pub token: Address,
        pub amount: Amount,
        pub call_data: Vec<u8>,
    }

    /// Target that logs every call and optionally reverts. Clones share
    /// the log, so a test can keep one clone and box the other.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingTarget {
        calls: Rc<RefCell<Vec<RecordedCall>>>,
        revert: Rc<RefCell<bool>>,
    }

    impl RecordingTarget {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reverting() -> Self {
            let target = Self::default();
            target.set_revert(true);
            target
        }

        pub fn set_revert(&self, revert: bool) {
            *self.revert.borrow_mut() = revert;
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.borrow().clone()
        }
    }

    impl CallTarget for RecordingTarget {
        fn call(&mut self, invocation: &Invocation<'_>) -> Result<()> {
            if *self.revert.borrow() {
                return Err(CrosslockError::CallReverted {
                    reason: "target reverted".into(),
                });
            }
            self.calls.borrow_mut().push(RecordedCall {
                order_id: invocation.order_id,
                token: invocation.token.clone(),
                amount: invocation.amount,
                call_data: invocation.call_data.to_vec(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslock_types::constants::SELECTOR_APPROVE;

    fn invocation<'a>(token: &'a Address, call_data: &'a [u8]) -> Invocation<'a> {
        Invocation {
            order_id: OrderId::from_bytes([1; 32]),
            token,
            amount: 50,
            gas_budget: 100_000,
            call_data,
        }
    }

    #[test]
    fn dispatches_to_registered_target() {
        let mut executor = ExternalCallExecutor::new(Address::evm_filled(0xee));
        let target = RecordingTarget::new();
        let to = Address::evm_filled(0x70);
        executor.register_target(to.clone(), Box::new(target.clone()));

        let token = Address::evm_filled(0x11);
        executor.execute(&to, &invocation(&token, &[1, 2, 3, 4, 5])).unwrap();
        let calls = target.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].amount, 50);
        assert_eq!(calls[0].call_data, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn blocked_selector_never_reaches_target() {
        let mut executor = ExternalCallExecutor::new(Address::evm_filled(0xee));
        let target = RecordingTarget::new();
        let to = Address::evm_filled(0x70);
        executor.register_target(to.clone(), Box::new(target.clone()));

        let token = Address::evm_filled(0x11);
        let err = executor
            .execute(&to, &invocation(&token, &SELECTOR_APPROVE))
            .unwrap_err();
        assert!(err.to_string().starts_with("CL_ERR_400"));
        assert!(target.calls().is_empty());
    }

    #[test]
    fn unknown_target_and_revert() {
        let mut executor = ExternalCallExecutor::new(Address::evm_filled(0xee));
        let token = Address::evm_filled(0x11);
        let to = Address::evm_filled(0x70);
        let err = executor.execute(&to, &invocation(&token, &[9; 4])).unwrap_err();
        assert!(matches!(err, CrosslockError::TargetNotRegistered(_)));

        executor.register_target(to.clone(), Box::new(RecordingTarget::reverting()));
        let err = executor.execute(&to, &invocation(&token, &[9; 4])).unwrap_err();
        assert!(matches!(err, CrosslockError::CallReverted { .. }));
    }
}
