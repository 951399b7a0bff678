//! Payout aggregation for claim batches.
//!
//! Settled orders add `(asset, recipient, amount)` legs; legs sharing an
//! asset and recipient collapse into one transfer, in order of first
//! appearance. Only settled orders contribute, so skipped orders never
//! leak into the totals.

use std::collections::HashMap;

use crosslock_runtime::AssetBook;
use crosslock_types::{Address, Amount, CrosslockError, Result};

/// One aggregated transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub asset: Address,
    pub recipient: Address,
    pub amount: Amount,
}

/// Ordered, aggregated set of payouts.
#[derive(Debug, Default)]
pub struct PayoutPlan {
    payouts: Vec<Payout>,
    index: HashMap<(Address, Address), usize>,
}

impl PayoutPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leg. Zero amounts are ignored.
    pub fn add(&mut self, asset: &Address, recipient: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let key = (asset.clone(), recipient.clone());
        if let Some(&idx) = self.index.get(&key) {
            let payout = &mut self.payouts[idx];
            payout.amount = payout
                .amount
                .checked_add(amount)
                .ok_or(CrosslockError::ArithmeticOverflow)?;
        } else {
            self.index.insert(key, self.payouts.len());
            self.payouts.push(Payout {
                asset: asset.clone(),
                recipient: recipient.clone(),
                amount,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn payouts(&self) -> &[Payout] {
        &self.payouts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payouts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payouts.is_empty()
    }

    /// Pay everything out of `escrow`, one transfer per payout.
    pub fn execute(&self, assets: &mut AssetBook, escrow: &Address) -> Result<()> {
        for payout in &self.payouts {
            assets.transfer(escrow, &payout.recipient, &payout.asset, payout.amount)?;
        }
        Ok(())
    }
}
