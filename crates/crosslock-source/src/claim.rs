//! Settlement claims delivered by the message bus.
//!
//! A claim batch is a fold: each order either settles, or becomes an
//! anomaly record and is skipped. Anomalies never fail the batch, since a
//! relayer cannot retry part of a delivered message.
//!
//! ```text
//! for id in batch:
//!     status != CREATED          ▶ unexpected-status record, skip
//!     take chain != origin chain ▶ CriticalMismatchChainId, skip
//!     otherwise                  ▶ payout legs + fee accrual
//! aggregate legs per (asset, recipient) ▶ one transfer each
//! ```
//!
//! Nothing is committed until the aggregated transfers succeed.

use std::collections::{HashMap, HashSet};

use crosslock_orderlib::SourceInstruction;
use crosslock_runtime::{AssetBook, CallContext};
use crosslock_types::{
    Address, Amount, ChainId, CrosslockError, DlnEvent, GiveOrderStatus, OrderId, Result,
};

use crate::ledger::DlnSource;
use crate::payout::PayoutPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimKind {
    Unlock,
    Cancel,
}

impl ClaimKind {
    fn settled_status(self) -> GiveOrderStatus {
        match self {
            Self::Unlock => GiveOrderStatus::ClaimedUnlock,
            Self::Cancel => GiveOrderStatus::ClaimedCancel,
        }
    }
}

/// Per-order result of the validation fold.
enum Outcome {
    Unexpected {
        order_id: OrderId,
        status: GiveOrderStatus,
    },
    Mismatch {
        order_id: OrderId,
        take_chain_id: ChainId,
    },
    Settled {
        order_id: OrderId,
        /// Unlock beneficiary or resolved cancel beneficiary.
        recipient: Address,
        paid_amount: Amount,
        give_token_address: Address,
    },
}

impl DlnSource {
    pub fn claim_unlock(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order_id: &OrderId,
        beneficiary: &Address,
    ) -> Result<()> {
        self.claim(assets, ctx, std::slice::from_ref(order_id), beneficiary, ClaimKind::Unlock)
    }

    pub fn claim_batch_unlock(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order_ids: &[OrderId],
        beneficiary: &Address,
    ) -> Result<()> {
        self.claim(assets, ctx, order_ids, beneficiary, ClaimKind::Unlock)
    }

    pub fn claim_cancel(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order_id: &OrderId,
        beneficiary: &Address,
    ) -> Result<()> {
        self.claim(assets, ctx, std::slice::from_ref(order_id), beneficiary, ClaimKind::Cancel)
    }

    pub fn claim_batch_cancel(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order_ids: &[OrderId],
        beneficiary: &Address,
    ) -> Result<()> {
        self.claim(assets, ctx, order_ids, beneficiary, ClaimKind::Cancel)
    }

    /// Decode a delivered [`SourceInstruction`] and run it.
    pub fn execute_forwarded(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        data: &[u8],
    ) -> Result<()> {
        match SourceInstruction::decode(data)? {
            SourceInstruction::ClaimUnlock {
                order_id,
                beneficiary,
            } => self.claim_unlock(assets, ctx, &order_id, &beneficiary),
            SourceInstruction::ClaimBatchUnlock {
                order_ids,
                beneficiary,
            } => self.claim_batch_unlock(assets, ctx, &order_ids, &beneficiary),
            SourceInstruction::ClaimCancel {
                order_id,
                beneficiary,
            } => self.claim_cancel(assets, ctx, &order_id, &beneficiary),
            SourceInstruction::ClaimBatchCancel {
                order_ids,
                beneficiary,
            } => self.claim_batch_cancel(assets, ctx, &order_ids, &beneficiary),
        }
    }

    /// Check the call came through the bus from our registered peer and
    /// return the origin chain.
    fn authenticate(&self, ctx: &CallContext) -> Result<ChainId> {
        if ctx.caller != self.call_proxy {
            return Err(CrosslockError::CallProxyBadRole);
        }
        let origin = ctx
            .origin
            .as_ref()
            .ok_or(CrosslockError::NativeSenderBadRole)?;
        match self.dln_destinations.get(&origin.chain_id_from) {
            Some(peer) if peer.address == origin.native_sender => Ok(origin.chain_id_from),
            _ => Err(CrosslockError::NativeSenderBadRole),
        }
    }

    fn claim(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order_ids: &[OrderId],
        beneficiary: &Address,
        kind: ClaimKind,
    ) -> Result<()> {
        let chain_id_from = self.authenticate(ctx)?;
        let native = assets.native_asset().clone();

        // Step 1: fold the batch into outcomes, payouts and fee accruals
        let mut outcomes = Vec::with_capacity(order_ids.len());
        let mut payouts = PayoutPlan::new();
        let mut accrued: HashMap<Address, Amount> = HashMap::new();
        let mut settled_here = HashSet::new();

        for order_id in order_ids {
            let status = if settled_here.contains(order_id) {
                kind.settled_status()
            } else {
                self.give_order_status(order_id)
            };
            let Some(state) = self
                .give_orders
                .get(order_id)
                .filter(|_| status == GiveOrderStatus::Created)
            else {
                outcomes.push(Outcome::Unexpected {
                    order_id: *order_id,
                    status,
                });
                continue;
            };
            if state.take_chain_id != chain_id_from {
                outcomes.push(Outcome::Mismatch {
                    order_id: *order_id,
                    take_chain_id: state.take_chain_id,
                });
                continue;
            }

            let token = &state.give_token_address;
            let (recipient, paid_amount) = match kind {
                ClaimKind::Unlock => {
                    payouts.add(token, beneficiary, state.give_amount)?;
                    if let Some(affiliate) = &state.affiliate_beneficiary {
                        payouts.add(token, affiliate, state.affiliate_amount)?;
                    }
                    self.accrue(&mut accrued, token, state.percent_fee)?;
                    (beneficiary.clone(), state.give_amount)
                }
                ClaimKind::Cancel => {
                    let recipient = state
                        .allowed_cancel_beneficiary
                        .clone()
                        .filter(|a| !a.is_zero())
                        .unwrap_or_else(|| beneficiary.clone());
                    let refund = [state.give_amount, state.percent_fee, state.affiliate_amount]
                        .into_iter()
                        .try_fold(0, Amount::checked_add)
                        .ok_or(CrosslockError::ArithmeticOverflow)?;
                    payouts.add(token, &recipient, refund)?;
                    (recipient, refund)
                }
            };
            self.accrue(&mut accrued, &native, state.native_fix_fee)?;

            settled_here.insert(*order_id);
            outcomes.push(Outcome::Settled {
                order_id: *order_id,
                recipient,
                paid_amount,
                give_token_address: token.clone(),
            });
        }

        // Step 2: pay out the aggregated legs
        let escrow = self.address.clone();
        assets.atomically(|book| payouts.execute(book, &escrow))?;

        // Step 3: commit state and emit
        self.collected_fee.extend(accrued);
        let settled = settled_here.len();
        for outcome in outcomes {
            self.commit(outcome, beneficiary, chain_id_from, kind);
        }

        tracing::info!(
            kind = ?kind,
            from = %chain_id_from,
            orders = order_ids.len(),
            settled,
            transfers = payouts.len(),
            "Claims settled"
        );
        Ok(())
    }

    /// Fold `amount` into the running fee total for `token`.
    fn accrue(
        &self,
        totals: &mut HashMap<Address, Amount>,
        token: &Address,
        amount: Amount,
    ) -> Result<()> {
        let current = totals
            .get(token)
            .copied()
            .unwrap_or_else(|| self.collected_fee(token));
        let total = current
            .checked_add(amount)
            .ok_or(CrosslockError::ArithmeticOverflow)?;
        totals.insert(token.clone(), total);
        Ok(())
    }

    fn commit(
        &mut self,
        outcome: Outcome,
        beneficiary: &Address,
        chain_id_from: ChainId,
        kind: ClaimKind,
    ) {
        match outcome {
            Outcome::Unexpected { order_id, status } => {
                tracing::warn!(
                    order_id = %order_id.short(),
                    %status,
                    kind = ?kind,
                    "Unexpected order status for claim"
                );
                let event = match kind {
                    ClaimKind::Unlock => {
                        self.unexpected_order_status_for_claim
                            .insert(order_id, beneficiary.clone());
                        DlnEvent::UnexpectedOrderStatusForClaim {
                            order_id,
                            status,
                            beneficiary: beneficiary.clone(),
                        }
                    }
                    ClaimKind::Cancel => {
                        self.unexpected_order_status_for_cancel
                            .insert(order_id, beneficiary.clone());
                        DlnEvent::UnexpectedOrderStatusForCancel {
                            order_id,
                            status,
                            beneficiary: beneficiary.clone(),
                        }
                    }
                };
                self.events.emit(event);
            }
            Outcome::Mismatch {
                order_id,
                take_chain_id,
            } => {
                tracing::error!(
                    order_id = %order_id.short(),
                    expected = %take_chain_id,
                    actual = %chain_id_from,
                    "Claim origin does not match order take chain"
                );
                self.events.emit(DlnEvent::CriticalMismatchChainId {
                    order_id,
                    beneficiary: beneficiary.clone(),
                    take_chain_id,
                    submission_chain_id_from: chain_id_from,
                });
            }
            Outcome::Settled {
                order_id,
                recipient,
                paid_amount,
                give_token_address,
            } => {
                if let Some(state) = self.give_orders.get_mut(&order_id) {
                    state.status = kind.settled_status();
                }
                tracing::debug!(order_id = %order_id.short(), recipient = %recipient, paid_amount, "Order settled");
                let event = match kind {
                    ClaimKind::Unlock => DlnEvent::ClaimedUnlock {
                        order_id,
                        beneficiary: recipient,
                        give_amount: paid_amount,
                        give_token_address,
                    },
                    ClaimKind::Cancel => DlnEvent::ClaimedOrderCancel {
                        order_id,
                        beneficiary: recipient,
                        paid_amount,
                        give_token_address,
                    },
                };
                self.events.emit(event);
            }
        }
    }
}
