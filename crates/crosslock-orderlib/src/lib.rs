//! # crosslock-orderlib
//!
//! Pure, stateless building blocks shared by the give-side and take-side
//! ledgers. Nothing in this crate touches balances or ledger state.
//!
//! ## Architecture
//!
//! - **Codec** ([`codec`]): canonical order encoding, order id and call id derivation
//! - **Fee engine** ([`fee`]): percent and affiliate fee netting, patch fees, account-model reward checks
//! - **Addresses** ([`address`]): address length validation per chain engine
//! - **Envelopes** ([`envelope`], [`external_call`]): affiliate fee, permit and external call layouts
//! - **Instructions** ([`instruction`]): settlement instructions for EVM-style and account-model give chains
//!
//! ```text
//! OrderCreation ──fee::apply_creation_fee──▶ Order (net) ──codec::derive_order_id──▶ OrderId
//!                                                                    │
//!                                   instruction::SourceInstruction ◀─┘ (take side → give side)
//! ```

pub mod address;
pub mod codec;
pub mod envelope;
pub mod external_call;
pub mod fee;
pub mod instruction;
pub mod wire;

pub use address::{validate_address, validate_optional_address};
pub use codec::{derive_call_id, derive_order_id, encode_order, external_call_hash};
pub use envelope::{AffiliateFee, PermitEnvelope, permit_digest};
pub use external_call::{ExternalCallEnvelope, ExternalCallPayload};
pub use fee::{
    CreationFee, PatchFee, apply_creation_fee, apply_patch_fee, percent_of,
    validate_solana_rewards,
};
pub use instruction::SourceInstruction;
