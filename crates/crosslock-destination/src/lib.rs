//! # crosslock-destination
//!
//! The take-side ledger. Takers pay receivers here, then send unlock
//! instructions back to the give side; order authorities send cancels for
//! orders nobody filled.
//!
//! ## Architecture
//!
//! - **[`DlnDestination`]**: take-order state, peers, batch limits, external call adapter
//! - **fulfill**: `fulfill_order`, `patch_order_take`
//! - **send**: EVM and account-model unlock/cancel messages, single and batched
//!
//! ```text
//! taker ── fulfill_order ──▶ DlnDestination ── take asset ──▶ receiver
//!                                 │              └─ with call ─▶ ExternalCallAdapter
//!                                 │
//!                                 └── send_*_unlock / send_*_cancel ──▶ MessageBus ──▶ give side
//! ```
//!
//! Status moves `NotSet → Fulfilled → SentUnlock` or `NotSet → SentCancel`;
//! nothing moves backwards.

pub mod fulfill;
pub mod ledger;
pub mod send;

pub use ledger::DlnDestination;
