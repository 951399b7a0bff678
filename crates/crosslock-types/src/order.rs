//! Order model shared by both ledgers.
//!
//! An [`Order`] is immutable once created and is identified by the hash of
//! its fields. Each ledger keeps its own per-order record:
//!
//! ```text
//! give side:  NotSet ──create──▶ Created ──claim──▶ ClaimedUnlock
//!                                       └──claim──▶ ClaimedCancel
//!
//! take side:  NotSet ──fulfill──▶ Fulfilled ──send──▶ SentUnlock
//!                └──────────────send cancel────────▶ SentCancel
//! ```

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, ChainId, constants};

// ---------------------------------------------------------------------------
// ChainEngine
// ---------------------------------------------------------------------------

/// Execution engine of a peer chain. Decides address length, batch limits
/// and how settlement instructions are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChainEngine {
    Evm = 1,
    Solana = 2,
}

impl ChainEngine {
    /// Byte length of addresses on chains of this engine.
    #[must_use]
    pub fn address_len(self) -> usize {
        match self {
            Self::Evm => constants::EVM_ADDRESS_LENGTH,
            Self::Solana => constants::SOLANA_ADDRESS_LENGTH,
        }
    }
}

impl std::fmt::Display for ChainEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evm => write!(f, "EVM"),
            Self::Solana => write!(f, "SOLANA"),
        }
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Give-side status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum GiveOrderStatus {
    #[default]
    NotSet = 0,
    Created = 1,
    ClaimedUnlock = 2,
    ClaimedCancel = 3,
}

impl std::fmt::Display for GiveOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSet => write!(f, "NOT_SET"),
            Self::Created => write!(f, "CREATED"),
            Self::ClaimedUnlock => write!(f, "CLAIMED_UNLOCK"),
            Self::ClaimedCancel => write!(f, "CLAIMED_CANCEL"),
        }
    }
}

/// Take-side status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TakeOrderStatus {
    #[default]
    NotSet = 0,
    Fulfilled = 1,
    SentUnlock = 2,
    SentCancel = 3,
}

impl std::fmt::Display for TakeOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSet => write!(f, "NOT_SET"),
            Self::Fulfilled => write!(f, "FULFILLED"),
            Self::SentUnlock => write!(f, "SENT_UNLOCK"),
            Self::SentCancel => write!(f, "SENT_CANCEL"),
        }
    }
}

/// Status of an external call held by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExternalCallStatus {
    #[default]
    Unset = 0,
    Created = 1,
    Executed = 2,
    Cancelled = 3,
}

impl std::fmt::Display for ExternalCallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "UNSET"),
            Self::Created => write!(f, "CREATED"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A cross-chain order as both ledgers see it.
///
/// `give_amount` is the amount left for the taker after percent and
/// affiliate fees. This is the order the give side emits at creation and
/// the one takers pass to the take side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub maker_order_nonce: u64,
    pub maker_src: Address,
    pub give_chain_id: ChainId,
    pub give_token_address: Address,
    pub give_amount: Amount,
    pub take_chain_id: ChainId,
    pub take_token_address: Address,
    pub take_amount: Amount,
    pub receiver_dst: Address,
    pub give_patch_authority_src: Address,
    /// Authority on the take chain allowed to patch the take amount and
    /// dispatch a cancel.
    pub order_authority_address_dst: Address,
    /// When set, only this address may be the unlock authority at fulfill.
    pub allowed_taker_dst: Option<Address>,
    /// When set, a cancel always pays out to this address.
    pub allowed_cancel_beneficiary_src: Option<Address>,
    /// Encoded external call envelope, run on the take chain at fulfill.
    pub external_call: Option<Vec<u8>>,
}

/// What a maker submits to create an order. The give side fills in the
/// maker, nonce and give chain, and nets the give amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreation {
    pub give_token_address: Address,
    /// Raw amount pulled from the maker, fees included.
    pub give_amount: Amount,
    pub take_token_address: Address,
    pub take_amount: Amount,
    pub take_chain_id: ChainId,
    pub receiver_dst: Address,
    pub give_patch_authority_src: Address,
    pub order_authority_address_dst: Address,
    pub allowed_taker_dst: Option<Address>,
    pub external_call: Option<Vec<u8>>,
    pub allowed_cancel_beneficiary_src: Option<Address>,
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// Give-side record of an order, keyed by order id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveOrderState {
    pub status: GiveOrderStatus,
    pub give_token_address: Address,
    /// Fixed native fee paid at creation.
    pub native_fix_fee: Amount,
    pub take_chain_id: ChainId,
    /// Percent fee accumulated over creation and all give patches.
    pub percent_fee: Amount,
    /// Current claimable give amount, including patches.
    pub give_amount: Amount,
    pub affiliate_beneficiary: Option<Address>,
    pub affiliate_amount: Amount,
    pub allowed_cancel_beneficiary: Option<Address>,
}

/// Take-side record of an order, keyed by order id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeOrderState {
    pub status: TakeOrderStatus,
    /// The unlock authority resolved at fulfill.
    pub taker_address: Address,
    pub give_chain_id: ChainId,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl OrderCreation {
    /// EVM to EVM order creation with distinct filler addresses.
    pub fn dummy(
        give_token: Address,
        give_amount: Amount,
        take_chain_id: ChainId,
        take_token: Address,
        take_amount: Amount,
    ) -> Self {
        Self {
            give_token_address: give_token,
            give_amount,
            take_token_address: take_token,
            take_amount,
            take_chain_id,
            receiver_dst: Address::evm_filled(0xd1),
            give_patch_authority_src: Address::evm_filled(0xa1),
            order_authority_address_dst: Address::evm_filled(0xa2),
            allowed_taker_dst: None,
            external_call: None,
            allowed_cancel_beneficiary_src: None,
        }
    }
}
