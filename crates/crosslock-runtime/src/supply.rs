//! Issuance record behind [`AssetBook::verify_supply`](crate::AssetBook::verify_supply).
//!
//! Value enters a book only through `mint`; transfers move it between
//! holders and nothing removes it. So for every asset the balances must sum
//! to exactly what was minted, and an asset nobody minted must have no
//! holders at all.

use std::collections::BTreeMap;

use crosslock_types::{Address, Amount, CrosslockError, Result};

#[derive(Debug, Clone, Default)]
pub(crate) struct Issuance {
    minted: BTreeMap<Address, Amount>,
}

impl Issuance {
    pub(crate) fn record(&mut self, asset: &Address, amount: Amount) {
        let total = self.minted.entry(asset.clone()).or_insert(0);
        *total = total.saturating_add(amount);
    }

    /// Compare every holder balance, grouped by asset, with issuance.
    pub(crate) fn check<'a>(
        &self,
        balances: impl IntoIterator<Item = (&'a Address, Amount)>,
    ) -> Result<()> {
        let mut held: BTreeMap<&Address, Amount> = BTreeMap::new();
        for (asset, amount) in balances {
            let total = held.entry(asset).or_insert(0);
            *total = total
                .checked_add(amount)
                .ok_or(CrosslockError::ArithmeticOverflow)?;
        }

        for (asset, &minted) in &self.minted {
            let actual = held.remove(asset).unwrap_or(0);
            if actual != minted {
                return Err(CrosslockError::SupplyInvariantViolation {
                    reason: format!("Asset {asset}: held {actual} != minted {minted}"),
                });
            }
        }
        if let Some((asset, actual)) = held.into_iter().find(|(_, amount)| *amount > 0) {
            return Err(CrosslockError::SupplyInvariantViolation {
                reason: format!("Asset {asset}: held {actual} but never minted"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdt() -> Address {
        Address::evm_filled(0x55)
    }

    #[test]
    fn balances_matching_issuance_pass() {
        let mut issuance = Issuance::default();
        issuance.record(&usdt(), 600);
        issuance.record(&usdt(), 400);
        let (a, b) = (usdt(), usdt());
        assert!(issuance.check([(&a, 250), (&b, 750)]).is_ok());
    }

    #[test]
    fn drift_detected() {
        let mut issuance = Issuance::default();
        let native = Address::zero();
        issuance.record(&native, 10);
        let err = issuance.check([(&native, 11)]).unwrap_err();
        assert!(format!("{err}").starts_with("CL_ERR_800"));
    }

    #[test]
    fn unminted_holdings_detected() {
        let issuance = Issuance::default();
        let stray = usdt();
        assert!(issuance.check([(&stray, 0)]).is_ok());
        let err = issuance.check([(&stray, 1)]).unwrap_err();
        assert!(format!("{err}").contains("never minted"));
    }
}
