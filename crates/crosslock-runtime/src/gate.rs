//! In-process message bus connecting ledgers on different chains.
//!
//! ```text
//! take side ── send ──▶ LoopbackGate (pending) ── oracles sign id
//!                                  │
//!            relayer ── claim(id, signatures) ──▶ verify ▶ guard ▶ execute
//!                                                                   │
//!                          give side ◀── forwarded CallContext ─────┘
//! ```
//!
//! A claim runs the delivered payload through a caller-supplied closure
//! with a [`CallContext`] whose caller is the gate's call proxy and whose
//! origin carries the sending chain and contract. The submission is marked
//! used only if the closure succeeds, so a rejected delivery can be retried
//! and a successful one can never run twice.

use std::collections::{HashMap, HashSet};

use crosslock_types::{Address, BusFeeConfig, CrosslockError, Result, SubmissionId};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::bus::{MessageBus, OutboundMessage};
use crate::context::{BusOrigin, CallContext};
use crate::guard::SubmissionGuard;

const SUBMISSION_DOMAIN: &[u8] = b"crosslock:submission:v1:";

/// A message waiting to be claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: SubmissionId,
    pub nonce: u64,
    pub message: OutboundMessage,
}

/// Loopback message bus with ed25519 oracle confirmations.
#[derive(Debug)]
pub struct LoopbackGate {
    fees: BusFeeConfig,
    treasury: Address,
    call_proxy: Address,
    oracles: Vec<SigningKey>,
    trusted: Vec<VerifyingKey>,
    min_confirmations: usize,
    nonce: u64,
    submissions: HashMap<SubmissionId, Submission>,
    /// Send order, for relayers that replay the outbox.
    outbox: Vec<SubmissionId>,
    guard: SubmissionGuard,
}

impl LoopbackGate {
    /// Create a gate signed by `oracles`, requiring `min_confirmations`
    /// distinct valid signatures per claim.
    ///
    /// # Errors
    /// [`CrosslockError::WrongArgument`] if the percent fee exceeds 10 000 bps.
    pub fn new(
        fees: BusFeeConfig,
        treasury: Address,
        call_proxy: Address,
        oracles: Vec<SigningKey>,
        min_confirmations: usize,
    ) -> Result<Self> {
        fees.validate()?;
        let trusted = oracles.iter().map(SigningKey::verifying_key).collect();
        Ok(Self {
            fees,
            treasury,
            call_proxy,
            oracles,
            trusted,
            min_confirmations,
            nonce: 0,
            submissions: HashMap::new(),
            outbox: Vec::new(),
            guard: SubmissionGuard::new(),
        })
    }

    /// Address whose calls the give side trusts as bus deliveries.
    #[must_use]
    pub fn call_proxy(&self) -> &Address {
        &self.call_proxy
    }

    pub fn set_fees(&mut self, fees: BusFeeConfig) -> Result<()> {
        fees.validate()?;
        self.fees = fees;
        Ok(())
    }

    #[must_use]
    pub fn submission(&self, id: &SubmissionId) -> Option<&Submission> {
        self.submissions.get(id)
    }

    /// Submission ids in send order.
    #[must_use]
    pub fn outbox(&self) -> &[SubmissionId] {
        &self.outbox
    }

    #[must_use]
    pub fn last_submission_id(&self) -> Option<SubmissionId> {
        self.outbox.last().copied()
    }

    #[must_use]
    pub fn is_claimed(&self, id: &SubmissionId) -> bool {
        self.guard.is_used(id)
    }

    /// Signatures of every oracle over a submission id.
    #[must_use]
    pub fn sign(&self, id: &SubmissionId) -> Vec<Vec<u8>> {
        self.oracles
            .iter()
            .map(|k| k.sign(id.as_bytes()).to_bytes().to_vec())
            .collect()
    }

    /// Deliver a submission once.
    ///
    /// # Errors
    /// - [`CrosslockError::SubmissionUsed`] if it was already claimed
    /// - [`CrosslockError::SubmissionNotFound`] for an unknown id
    /// - [`CrosslockError::NotConfirmed`] without enough valid signatures
    /// - whatever `execute` returns
    pub fn claim<T>(
        &mut self,
        id: &SubmissionId,
        signatures: &[Vec<u8>],
        execute: impl FnOnce(&CallContext, &[u8]) -> Result<T>,
    ) -> Result<T> {
        self.guard.check(id)?;
        let submission = self
            .submissions
            .get(id)
            .ok_or(CrosslockError::SubmissionNotFound(*id))?;

        let valid = self.count_confirmations(id, signatures);
        if valid < self.min_confirmations {
            return Err(CrosslockError::NotConfirmed {
                valid,
                required: self.min_confirmations,
            });
        }

        let chain_id_from = submission.message.chain_id_from;
        let ctx = CallContext::forwarded(
            self.call_proxy.clone(),
            BusOrigin {
                chain_id_from,
                native_sender: submission.message.sender.clone(),
            },
        );
        let result = execute(&ctx, &submission.message.data)?;
        self.guard.mark_used(*id)?;

        tracing::info!(submission = %id, from = %chain_id_from, "Submission claimed");
        Ok(result)
    }

    fn count_confirmations(&self, id: &SubmissionId, signatures: &[Vec<u8>]) -> usize {
        let mut confirmed = HashSet::new();
        for raw in signatures {
            let Ok(signature) = Signature::from_slice(raw) else {
                continue;
            };
            for (idx, key) in self.trusted.iter().enumerate() {
                if key.verify(id.as_bytes(), &signature).is_ok() {
                    confirmed.insert(idx);
                }
            }
        }
        confirmed.len()
    }

    fn derive_submission_id(nonce: u64, message: &OutboundMessage) -> SubmissionId {
        let mut hasher = Sha256::new();
        hasher.update(SUBMISSION_DOMAIN);
        hasher.update(message.chain_id_from.to_le_bytes());
        hasher.update(message.chain_id_to.to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        hasher.update(message.sender.as_bytes());
        hasher.update(message.receiver.as_bytes());
        hasher.update(message.execution_fee.to_le_bytes());
        hasher.update(&message.data);
        SubmissionId::from_bytes(hasher.finalize().into())
    }
}

impl MessageBus for LoopbackGate {
    fn fees(&self) -> BusFeeConfig {
        self.fees
    }

    fn treasury(&self) -> Address {
        self.treasury.clone()
    }

    fn send(&mut self, message: OutboundMessage) -> Result<SubmissionId> {
        let nonce = self.nonce;
        self.nonce += 1;
        let id = Self::derive_submission_id(nonce, &message);

        tracing::info!(
            submission = %id,
            from = %message.chain_id_from,
            to = %message.chain_id_to,
            bytes = message.data.len(),
            "Message sent"
        );
        self.submissions.insert(id, Submission { id, nonce, message });
        self.outbox.push(id);
        Ok(id)
    }
}
