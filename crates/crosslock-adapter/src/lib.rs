//! # crosslock-adapter
//!
//! Take-chain side of external calls: after an order is fulfilled, its
//! funds land here and the attached payload is run against a target.
//!
//! ## Architecture
//!
//! - **[`ExternalCallAdapter`]**: accepts funds from the take-side ledger, registers or runs calls, cancels them
//! - **[`ExternalCallExecutor`]**: dispatches a payload to a registered [`CallTarget`]
//! - **[`SelectorPolicy`]**: blocklist of four-byte call data prefixes checked before every dispatch

pub mod adapter;
pub mod executor;
pub mod selector;

pub use adapter::{CallFunds, ExternalCallAdapter};
pub use executor::{CallTarget, ExternalCallExecutor, Invocation};
pub use selector::SelectorPolicy;

#[cfg(any(test, feature = "test-helpers"))]
pub use executor::{RecordedCall, RecordingTarget};
