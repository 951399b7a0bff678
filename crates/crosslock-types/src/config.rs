//! Configuration types for the ledgers and the message bus.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, ChainEngine, CrosslockError, Result, constants};

/// Fees the give-side ledger charges at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Flat fee in the native asset, charged on every order.
    pub fixed_native_fee: Amount,
    /// Proportional fee on the give amount, in basis points.
    pub transfer_fee_bps: u64,
}

impl FeeConfig {
    /// Reject a percent fee above 100%.
    pub fn validate(&self) -> Result<()> {
        check_bps("transfer fee", self.transfer_fee_bps)
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fixed_native_fee: constants::DEFAULT_FIXED_NATIVE_FEE,
            transfer_fee_bps: constants::DEFAULT_TRANSFER_FEE_BPS,
        }
    }
}

/// Fees the message bus charges for one outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusFeeConfig {
    pub fixed_native_fee: Amount,
    pub transfer_fee_bps: u64,
}

impl BusFeeConfig {
    /// Reject a percent fee above 100%.
    pub fn validate(&self) -> Result<()> {
        check_bps("bus transfer fee", self.transfer_fee_bps)
    }
}

impl Default for BusFeeConfig {
    fn default() -> Self {
        Self {
            fixed_native_fee: constants::DEFAULT_FIXED_NATIVE_FEE,
            transfer_fee_bps: constants::DEFAULT_TRANSFER_FEE_BPS,
        }
    }
}

fn check_bps(what: &str, bps: u64) -> Result<()> {
    if u128::from(bps) > constants::BPS_DENOMINATOR {
        return Err(CrosslockError::wrong_argument(format!(
            "{what} {bps} bps above {}",
            constants::BPS_DENOMINATOR
        )));
    }
    Ok(())
}

/// Maximum orders per unlock batch, per destination engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    pub max_evm_unlock: usize,
    pub max_solana_unlock: usize,
}

impl BatchLimits {
    #[must_use]
    pub fn for_engine(&self, engine: ChainEngine) -> usize {
        match engine {
            ChainEngine::Evm => self.max_evm_unlock,
            ChainEngine::Solana => self.max_solana_unlock,
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_evm_unlock: constants::DEFAULT_MAX_EVM_UNLOCK_BATCH,
            max_solana_unlock: constants::DEFAULT_MAX_SOLANA_UNLOCK_BATCH,
        }
    }
}

/// Counterpart ledger registered for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub address: Address,
    pub engine: ChainEngine,
}
