//! System-wide constants for crosslock.

/// Denominator for basis-point fees (10 000 bps = 100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Address length on EVM-style chains.
pub const EVM_ADDRESS_LENGTH: usize = 20;

/// Address length on account-model chains.
pub const SOLANA_ADDRESS_LENGTH: usize = 32;

/// Chain id of the account-model chain as seen by the message bus.
pub const SOLANA_CHAIN_ID: u64 = 7_565_164;

/// Default maximum number of orders in one EVM unlock batch.
pub const DEFAULT_MAX_EVM_UNLOCK_BATCH: usize = 10;

/// Default maximum number of orders in one account-model unlock batch.
pub const DEFAULT_MAX_SOLANA_UNLOCK_BATCH: usize = 7;

/// Default fixed fee charged by the give-side ledger, in native units.
pub const DEFAULT_FIXED_NATIVE_FEE: u128 = 1_000;

/// Default proportional fee charged by the give-side ledger.
pub const DEFAULT_TRANSFER_FEE_BPS: u64 = 10;

/// Only external call envelope version understood by the adapter.
pub const EXTERNAL_CALL_ENVELOPE_VERSION: u8 = 1;

/// `approve(address,uint256)`
pub const SELECTOR_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// `transferFrom(address,address,uint256)`
pub const SELECTOR_TRANSFER_FROM: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];

/// `transfer(address,uint256)`
pub const SELECTOR_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `increaseAllowance(address,uint256)`
pub const SELECTOR_INCREASE_ALLOWANCE: [u8; 4] = [0x39, 0x50, 0x93, 0x51];

/// Selectors refused by the executor unless the policy is changed.
pub const DEFAULT_PROHIBITED_SELECTORS: [[u8; 4]; 4] = [
    SELECTOR_APPROVE,
    SELECTOR_TRANSFER_FROM,
    SELECTOR_TRANSFER,
    SELECTOR_INCREASE_ALLOWANCE,
];

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Crosslock";
