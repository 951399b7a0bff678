//! # crosslock-source
//!
//! The give-side ledger. Makers escrow assets here; the take side later
//! tells it, through the message bus, whom to release them to.
//!
//! ## Architecture
//!
//! - **[`DlnSource`]**: order state, peers, fee schedule and collected fees
//! - **create**: `create_order`, `create_salted_order`, `patch_order_give`
//! - **claim**: `claim_unlock`, `claim_cancel` and their batch forms, `execute_forwarded`
//! - **[`PayoutPlan`]**: per (asset, recipient) aggregation of claim payouts
//!
//! ```text
//! maker ── create_order ──▶ DlnSource ── escrow ──▶ AssetBook
//!                              ▲
//!   LoopbackGate ── claim ─────┘ (call proxy + registered peer only)
//! ```

pub mod claim;
pub mod create;
pub mod ledger;
pub mod payout;

pub use ledger::DlnSource;
pub use payout::{Payout, PayoutPlan};
