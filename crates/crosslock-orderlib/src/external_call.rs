//! External call envelope attached to orders that run a payload on the
//! take chain after fulfillment.
//!
//! Layout (version 1):
//!
//! ```text
//! u8      version (= 1)
//! bytes   fallback address
//! opt     delegated executor address
//! u128    execution fee
//! bool    allow delayed execution
//! bool    require successful execution
//! bytes   payload.to
//! u32     payload.gas budget
//! bytes   payload.call data
//! ```

use crosslock_types::{Address, Amount, CrosslockError, Result, constants};

use crate::wire::{Reader, Writer};

/// The call to make on the take chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCallPayload {
    pub to: Address,
    pub gas_budget: u32,
    pub call_data: Vec<u8>,
}

/// Decoded external call envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCallEnvelope {
    /// Receives the funds when the call fails.
    pub fallback_address: Address,
    /// When set, only this address may run a registered call.
    pub executor_address: Option<Address>,
    /// Paid to the reward beneficiary out of the transferred amount.
    pub execution_fee: Amount,
    pub allow_delayed_execution: bool,
    pub require_successful_execution: bool,
    pub payload: ExternalCallPayload,
}

impl ExternalCallEnvelope {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        Writer::new()
            .u8(constants::EXTERNAL_CALL_ENVELOPE_VERSION)
            .bytes(self.fallback_address.as_bytes())
            .opt_bytes(self.executor_address.as_ref().map(Address::as_bytes))
            .u128(self.execution_fee)
            .bool(self.allow_delayed_execution)
            .bool(self.require_successful_execution)
            .bytes(self.payload.to.as_bytes())
            .u32(self.payload.gas_budget)
            .bytes(&self.payload.call_data)
            .finish()
    }

    /// Decode an envelope.
    ///
    /// # Errors
    /// [`CrosslockError::InvalidExternalCall`] for empty input, an unknown
    /// version, or any layout problem.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_inner(bytes).map_err(|e| match e {
            CrosslockError::MalformedEnvelope { reason } => {
                CrosslockError::InvalidExternalCall { reason }
            }
            other => other,
        })
    }

    fn decode_inner(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let version = r.u8()?;
        if version != constants::EXTERNAL_CALL_ENVELOPE_VERSION {
            return Err(CrosslockError::InvalidExternalCall {
                reason: format!("unsupported envelope version {version}"),
            });
        }
        let fallback_address = Address::new(r.bytes()?);
        let executor_address = r.opt_bytes()?.map(Address::new);
        let execution_fee = r.u128()?;
        let allow_delayed_execution = r.bool()?;
        let require_successful_execution = r.bool()?;
        let to = Address::new(r.bytes()?);
        let gas_budget = r.u32()?;
        let call_data = r.bytes()?.to_vec();
        r.finish()?;

        Ok(Self {
            fallback_address,
            executor_address,
            execution_fee,
            allow_delayed_execution,
            require_successful_execution,
            payload: ExternalCallPayload {
                to,
                gas_budget,
                call_data,
            },
        })
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ExternalCallEnvelope {
    /// Immediate-execution envelope calling `to` with `call_data`.
    pub fn simple(to: Address, fallback: Address, execution_fee: Amount, call_data: Vec<u8>) -> Self {
        Self {
            fallback_address: fallback,
            executor_address: None,
            execution_fee,
            allow_delayed_execution: true,
            require_successful_execution: false,
            payload: ExternalCallPayload {
                to,
                gas_budget: 100_000,
                call_data,
            },
        }
    }
}
