//! Identifiers used throughout crosslock.
//!
//! Order, call and submission identifiers are content-addressed 32-byte
//! digests: every ledger that sees the same inputs derives the same id.
//! Addresses are raw byte strings whose length depends on the engine of
//! the chain they live on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Token and native amounts, in base units of the asset.
pub type Amount = u128;

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            #[must_use]
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// First four bytes, hex encoded. Handy in log lines.
            #[must_use]
            pub fn short(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "0x{}"), hex::encode(self.0))
            }
        }
    };
}

// ---------------------------------------------------------------------------
// OrderId / CallId / SubmissionId
// ---------------------------------------------------------------------------

digest_id!(
    /// Content hash of an [`Order`](crate::Order). Both ledgers derive it
    /// independently from the order fields.
    OrderId,
    ""
);

digest_id!(
    /// Identifier of an external call registered with the adapter.
    CallId,
    "call:"
);

digest_id!(
    /// Identifier the message bus assigns to an outbound message.
    SubmissionId,
    "sub:"
);

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// Numeric chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Chain id the bus uses for the account-model chain.
    pub const SOLANA: Self = Self(constants::SOLANA_CHAIN_ID);

    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A variable-length address on some chain.
///
/// EVM-style chains use 20 bytes, account-model chains use 32. The
/// native asset of an EVM-style chain is represented by the 20-byte zero
/// address, matching how token addresses are carried in orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct Address(pub Vec<u8>);

impl Address {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn evm(bytes: [u8; 20]) -> Self {
        Self(bytes.to_vec())
    }

    /// The EVM zero address, used as the native asset and as "nobody".
    #[must_use]
    pub fn zero() -> Self {
        Self(vec![0u8; constants::EVM_ADDRESS_LENGTH])
    }

    /// An address is zero when it is empty or all of its bytes are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(4)])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self::evm(bytes)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// 20-byte address with every byte set to `byte`.
    #[must_use]
    pub fn evm_filled(byte: u8) -> Self {
        Self(vec![byte; constants::EVM_ADDRESS_LENGTH])
    }

    /// 32-byte address with every byte set to `byte`.
    #[must_use]
    pub fn solana_filled(byte: u8) -> Self {
        Self(vec![byte; constants::SOLANA_ADDRESS_LENGTH])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_native_sized() {
        let zero = Address::zero();
        assert_eq!(zero.len(), 20);
        assert!(zero.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::evm_filled(1).is_zero());
    }

    #[test]
    fn address_display_is_hex() {
        let addr = Address::new(vec![0xab, 0xcd]);
        assert_eq!(addr.to_string(), "0xabcd");
        assert_eq!(addr.short(), "abcd");
    }

    #[test]
    fn order_id_display() {
        let id = OrderId::from_bytes([0x11; 32]);
        assert!(id.to_string().starts_with("0x1111"));
        assert_eq!(id.short(), "11111111");
        assert!(CallId::default().to_string().starts_with("call:0x"));
        assert!(SubmissionId::default().to_string().starts_with("sub:0x"));
    }

    #[test]
    fn chain_id_display() {
        assert_eq!(ChainId(56).to_string(), "chain:56");
        assert_eq!(ChainId::SOLANA.0, 7_565_164);
    }

    #[test]
    fn serde_roundtrips() {
        let id = OrderId::from_bytes([7; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let addr = Address::solana_filled(3);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
