//! # crosslock-runtime
//!
//! The collaborators a ledger needs but does not own: the per-chain asset
//! book, the identity of the caller, and the message bus.
//!
//! ## Architecture
//!
//! - **[`AssetBook`]**: native and token balances, allowances, signed permits, transfer log, all-or-nothing blocks
//! - **[`CallContext`]**: caller, attached native value, bus origin for forwarded calls
//! - **[`MessageBus`]**: outbound half of the bus as a trait
//! - **[`LoopbackGate`]**: in-process bus with ed25519 oracle confirmations and a [`SubmissionGuard`]
//! - **supply**: per-asset issuance record behind [`AssetBook::verify_supply`]

pub mod assets;
pub mod bus;
pub mod context;
pub mod gate;
pub mod guard;
mod supply;

pub use assets::{AssetBook, TransferRecord};
pub use bus::{MessageBus, OutboundMessage};
pub use context::{BusOrigin, CallContext};
pub use gate::{LoopbackGate, Submission};
pub use guard::SubmissionGuard;
