//! # crosslock-types
//!
//! Shared types, errors, and configuration for the **crosslock** cross-chain
//! settlement ledgers.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`CallId`], [`SubmissionId`], [`ChainId`], [`Address`], [`Amount`]
//! - **Order model**: [`Order`], [`OrderCreation`], [`ChainEngine`]
//! - **Ledger records**: [`GiveOrderState`], [`TakeOrderState`] and their statuses, [`ExternalCallStatus`]
//! - **Events**: [`DlnEvent`], [`EventRecord`], [`EventLog`]
//! - **Configuration**: [`FeeConfig`], [`BusFeeConfig`], [`BatchLimits`], [`PeerConfig`]
//! - **Errors**: [`CrosslockError`] with `CL_ERR_` prefix codes
//! - **Constants**: fee denominators, address lengths, default limits, blocked selectors

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod ids;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use crosslock_types::{Order, OrderId, Address, ...};

pub use config::*;
pub use error::*;
pub use events::*;
pub use ids::*;
pub use order::*;

// Constants are accessed via `crosslock_types::constants::FOO`
// (not re-exported to avoid name collisions).
