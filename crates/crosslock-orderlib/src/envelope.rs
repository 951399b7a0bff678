//! Small opaque envelopes makers attach to give-side calls.
//!
//! - affiliate fee: empty, or `beneficiary (20 bytes) || amount (u128 LE)`
//! - permit: empty, or `amount (u128) || deadline (i64 unix secs) || signature (64 bytes)`

use crosslock_types::{Address, Amount, CrosslockError, Result, constants::EVM_ADDRESS_LENGTH};
use sha2::{Digest, Sha256};

use crate::wire::{Reader, Writer};

const PERMIT_DOMAIN: &[u8] = b"crosslock:permit:v1:";
const AFFILIATE_LEN: usize = EVM_ADDRESS_LENGTH + 16;
const SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Affiliate fee
// ---------------------------------------------------------------------------

/// Third-party fee deducted from the give amount at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateFee {
    pub beneficiary: Address,
    pub amount: Amount,
}

impl AffiliateFee {
    /// Decode an affiliate envelope. Empty input means no affiliate.
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        if bytes.len() != AFFILIATE_LEN {
            return Err(CrosslockError::wrong_argument(format!(
                "affiliate fee envelope must be {AFFILIATE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = Reader::new(bytes);
        let beneficiary = Address::new(r.take(EVM_ADDRESS_LENGTH)?);
        let amount = r.u128()?;
        Ok(Some(Self {
            beneficiary,
            amount,
        }))
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        Writer::new()
            .fixed(self.beneficiary.as_bytes())
            .u128(self.amount)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Permit
// ---------------------------------------------------------------------------

/// Signed allowance letting a ledger pull tokens without a prior approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitEnvelope {
    pub amount: Amount,
    /// Unix timestamp (seconds) after which the permit is void.
    pub deadline: i64,
    pub signature: Vec<u8>,
}

impl PermitEnvelope {
    /// Decode a permit envelope. Empty input means no permit.
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        let mut r = Reader::new(bytes);
        let amount = r.u128()?;
        let deadline = r.i64()?;
        let signature = r.take(SIGNATURE_LEN)?.to_vec();
        r.finish()?;
        Ok(Some(Self {
            amount,
            deadline,
            signature,
        }))
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        Writer::new()
            .u128(self.amount)
            .i64(self.deadline)
            .fixed(&self.signature)
            .finish()
    }
}

/// Digest the owner signs to authorize `spender` to pull `amount` of
/// `token` until `deadline`.
#[must_use]
pub fn permit_digest(
    owner: &Address,
    spender: &Address,
    token: &Address,
    amount: Amount,
    deadline: i64,
) -> [u8; 32] {
    let encoded = Writer::new()
        .bytes(owner.as_bytes())
        .bytes(spender.as_bytes())
        .bytes(token.as_bytes())
        .u128(amount)
        .i64(deadline)
        .finish();
    let mut hasher = Sha256::new();
    hasher.update(PERMIT_DOMAIN);
    hasher.update(encoded);
    hasher.finalize().into()
}
