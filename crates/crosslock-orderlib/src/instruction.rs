//! Settlement instructions the take side sends to the give side.
//!
//! EVM-style give chains receive a [`SourceInstruction`]: a four-byte
//! selector followed by the encoded arguments. Account-model give chains
//! receive a list of program instructions, each prefixed with the
//! program's eight-byte method discriminator.

use crosslock_types::{Address, ChainId, CrosslockError, OrderId, Result};
use sha2::{Digest, Sha256};

use crate::wire::{Reader, Writer};

// ---------------------------------------------------------------------------
// EVM-style
// ---------------------------------------------------------------------------

const SIG_CLAIM_UNLOCK: &str = "claimUnlock(bytes32,address)";
const SIG_CLAIM_BATCH_UNLOCK: &str = "claimBatchUnlock(bytes32[],address)";
const SIG_CLAIM_CANCEL: &str = "claimCancel(bytes32,address)";
const SIG_CLAIM_BATCH_CANCEL: &str = "claimBatchCancel(bytes32[],address)";

/// First four bytes of the SHA-256 of a method signature.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Sha256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// A call the take side asks the give side to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInstruction {
    ClaimUnlock {
        order_id: OrderId,
        beneficiary: Address,
    },
    ClaimBatchUnlock {
        order_ids: Vec<OrderId>,
        beneficiary: Address,
    },
    ClaimCancel {
        order_id: OrderId,
        beneficiary: Address,
    },
    ClaimBatchCancel {
        order_ids: Vec<OrderId>,
        beneficiary: Address,
    },
}

impl SourceInstruction {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            Self::ClaimUnlock {
                order_id,
                beneficiary,
            } => {
                w.fixed(&selector(SIG_CLAIM_UNLOCK))
                    .fixed(order_id.as_bytes())
                    .bytes(beneficiary.as_bytes());
            }
            Self::ClaimCancel {
                order_id,
                beneficiary,
            } => {
                w.fixed(&selector(SIG_CLAIM_CANCEL))
                    .fixed(order_id.as_bytes())
                    .bytes(beneficiary.as_bytes());
            }
            Self::ClaimBatchUnlock {
                order_ids,
                beneficiary,
            } => {
                w.fixed(&selector(SIG_CLAIM_BATCH_UNLOCK));
                write_ids(&mut w, order_ids);
                w.bytes(beneficiary.as_bytes());
            }
            Self::ClaimBatchCancel {
                order_ids,
                beneficiary,
            } => {
                w.fixed(&selector(SIG_CLAIM_BATCH_CANCEL));
                write_ids(&mut w, order_ids);
                w.bytes(beneficiary.as_bytes());
            }
        }
        w.finish()
    }

    /// Decode a delivered instruction.
    ///
    /// # Errors
    /// [`CrosslockError::MalformedEnvelope`] for an unknown selector or a
    /// bad layout.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let sel: [u8; 4] = r.array()?;
        let instruction = if sel == selector(SIG_CLAIM_UNLOCK) {
            Self::ClaimUnlock {
                order_id: OrderId::from_bytes(r.array()?),
                beneficiary: Address::new(r.bytes()?),
            }
        } else if sel == selector(SIG_CLAIM_CANCEL) {
            Self::ClaimCancel {
                order_id: OrderId::from_bytes(r.array()?),
                beneficiary: Address::new(r.bytes()?),
            }
        } else if sel == selector(SIG_CLAIM_BATCH_UNLOCK) {
            Self::ClaimBatchUnlock {
                order_ids: read_ids(&mut r)?,
                beneficiary: Address::new(r.bytes()?),
            }
        } else if sel == selector(SIG_CLAIM_BATCH_CANCEL) {
            Self::ClaimBatchCancel {
                order_ids: read_ids(&mut r)?,
                beneficiary: Address::new(r.bytes()?),
            }
        } else {
            return Err(CrosslockError::malformed(format!(
                "unknown selector 0x{}",
                hex::encode(sel)
            )));
        };
        r.finish()?;
        Ok(instruction)
    }
}

fn write_ids(w: &mut Writer, ids: &[OrderId]) {
    let count = u32::try_from(ids.len()).unwrap_or(u32::MAX);
    w.u32(count);
    for id in ids {
        w.fixed(id.as_bytes());
    }
}

fn read_ids(r: &mut Reader<'_>) -> Result<Vec<OrderId>> {
    let count = r.u32()? as usize;
    if count.saturating_mul(32) > r.remaining() {
        return Err(CrosslockError::malformed(format!(
            "{count} order ids do not fit in {} bytes",
            r.remaining()
        )));
    }
    (0..count)
        .map(|_| r.array().map(OrderId::from_bytes))
        .collect()
}

// ---------------------------------------------------------------------------
// Account-model
// ---------------------------------------------------------------------------

/// Eight-byte method discriminator of an account-model program method.
#[must_use]
pub fn program_discriminator(method: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{method}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Create the beneficiary's token account if it does not exist yet.
#[must_use]
pub fn encode_solana_init_wallet_if_needed(
    beneficiary: &Address,
    give_token: &Address,
    reward: u64,
) -> Vec<u8> {
    Writer::new()
        .fixed(&program_discriminator("init_wallet_if_needed"))
        .fixed(beneficiary.as_bytes())
        .fixed(give_token.as_bytes())
        .u64(reward)
        .finish()
}

/// Settle one order to the unlock beneficiary.
#[must_use]
pub fn encode_solana_claim_unlock(
    take_chain_id: ChainId,
    src_program_id: &Address,
    beneficiary: &Address,
    give_token: &Address,
    order_id: &OrderId,
    reward: u64,
) -> Vec<u8> {
    encode_solana_claim("claim_unlock", take_chain_id, src_program_id, beneficiary, give_token, order_id, reward)
}

/// Settle one order to the cancel beneficiary.
#[must_use]
pub fn encode_solana_claim_cancel(
    take_chain_id: ChainId,
    src_program_id: &Address,
    beneficiary: &Address,
    give_token: &Address,
    order_id: &OrderId,
    reward: u64,
) -> Vec<u8> {
    encode_solana_claim("claim_cancel", take_chain_id, src_program_id, beneficiary, give_token, order_id, reward)
}

fn encode_solana_claim(
    method: &str,
    take_chain_id: ChainId,
    src_program_id: &Address,
    beneficiary: &Address,
    give_token: &Address,
    order_id: &OrderId,
    reward: u64,
) -> Vec<u8> {
    Writer::new()
        .fixed(&program_discriminator(method))
        .u64(take_chain_id.0)
        .fixed(src_program_id.as_bytes())
        .fixed(beneficiary.as_bytes())
        .fixed(give_token.as_bytes())
        .fixed(order_id.as_bytes())
        .u64(reward)
        .finish()
}

/// Pack program instructions into one message body.
#[must_use]
pub fn encode_solana_batch(instructions: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(u32::try_from(instructions.len()).unwrap_or(u32::MAX));
    for ix in instructions {
        w.bytes(ix);
    }
    w.finish()
}

/// Split a message body back into its program instructions.
pub fn decode_solana_batch(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut r = Reader::new(data);
    let count = r.u32()? as usize;
    let mut out = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        out.push(r.bytes()?.to_vec());
    }
    r.finish()?;
    Ok(out)
}
