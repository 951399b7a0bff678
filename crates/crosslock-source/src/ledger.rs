//! `DlnSource` state, queries and admin surface.
//!
//! Order creation and patching live in [`crate::create`], settlement
//! claims in [`crate::claim`]; both extend the same struct.

use std::collections::HashMap;

use crosslock_orderlib::validate_address;
use crosslock_runtime::{AssetBook, CallContext};
use crosslock_types::{
    Address, Amount, ChainEngine, ChainId, CrosslockError, DlnEvent, EventLog, EventRecord,
    FeeConfig, GiveOrderState, GiveOrderStatus, OrderId, PeerConfig, Result,
};

/// Give-side ledger for one chain.
///
/// Escrows give assets at its own `address` in the [`AssetBook`]; every
/// payout leaves from there.
#[derive(Debug)]
pub struct DlnSource {
    pub(crate) chain_id: ChainId,
    pub(crate) address: Address,
    pub(crate) admin: Address,
    /// Bus address whose calls carry an authenticated origin.
    pub(crate) call_proxy: Address,
    pub(crate) fees: FeeConfig,
    /// Take-side ledger registered per take chain.
    pub(crate) dln_destinations: HashMap<ChainId, PeerConfig>,
    pub(crate) give_orders: HashMap<OrderId, GiveOrderState>,
    /// Cumulative net increase per order.
    pub(crate) give_patches: HashMap<OrderId, Amount>,
    pub(crate) master_nonce: HashMap<Address, u64>,
    /// Fees accrued at claim time, per asset, awaiting `withdraw_fee`.
    pub(crate) collected_fee: HashMap<Address, Amount>,
    pub(crate) unexpected_order_status_for_claim: HashMap<OrderId, Address>,
    pub(crate) unexpected_order_status_for_cancel: HashMap<OrderId, Address>,
    pub(crate) events: EventLog,
}

impl DlnSource {
    #[must_use]
    pub fn new(
        chain_id: ChainId,
        address: Address,
        admin: Address,
        call_proxy: Address,
        fees: FeeConfig,
    ) -> Self {
        Self {
            chain_id,
            address,
            admin,
            call_proxy,
            fees,
            dln_destinations: HashMap::new(),
            give_orders: HashMap::new(),
            give_patches: HashMap::new(),
            master_nonce: HashMap::new(),
            collected_fee: HashMap::new(),
            unexpected_order_status_for_claim: HashMap::new(),
            unexpected_order_status_for_cancel: HashMap::new(),
            events: EventLog::new(),
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn fees(&self) -> FeeConfig {
        self.fees
    }

    #[must_use]
    pub fn give_order(&self, order_id: &OrderId) -> Option<&GiveOrderState> {
        self.give_orders.get(order_id)
    }

    /// Status of an order, NOT_SET if unknown.
    #[must_use]
    pub fn give_order_status(&self, order_id: &OrderId) -> GiveOrderStatus {
        self.give_orders
            .get(order_id)
            .map_or(GiveOrderStatus::NotSet, |s| s.status)
    }

    #[must_use]
    pub fn give_patch(&self, order_id: &OrderId) -> Amount {
        self.give_patches.get(order_id).copied().unwrap_or(0)
    }

    /// Nonce the next `create_order` from `maker` will use.
    #[must_use]
    pub fn master_nonce(&self, maker: &Address) -> u64 {
        self.master_nonce.get(maker).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn collected_fee(&self, token: &Address) -> Amount {
        self.collected_fee.get(token).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn unexpected_order_status_for_claim(&self, order_id: &OrderId) -> Option<&Address> {
        self.unexpected_order_status_for_claim.get(order_id)
    }

    #[must_use]
    pub fn unexpected_order_status_for_cancel(&self, order_id: &OrderId) -> Option<&Address> {
        self.unexpected_order_status_for_cancel.get(order_id)
    }

    #[must_use]
    pub fn dln_destination_address(&self, chain_id: ChainId) -> Option<&PeerConfig> {
        self.dln_destinations.get(&chain_id)
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    // -----------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------

    /// Register the take-side ledger on `chain_id_to`.
    pub fn set_dln_destination_address(
        &mut self,
        ctx: &CallContext,
        chain_id_to: ChainId,
        address: Address,
        engine: ChainEngine,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        validate_address("dln_destination", &address, engine)?;
        self.dln_destinations.insert(
            chain_id_to,
            PeerConfig {
                address: address.clone(),
                engine,
            },
        );
        tracing::info!(chain = %chain_id_to, peer = %address, %engine, "Take-side ledger registered");
        self.events.emit(DlnEvent::DlnDestinationAddressUpdated {
            chain_id_to,
            address,
            engine,
        });
        Ok(())
    }

    /// Replace the fee schedule for new orders.
    pub fn update_global_fee(
        &mut self,
        ctx: &CallContext,
        fixed_native_fee: Amount,
        transfer_fee_bps: u64,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        let fees = FeeConfig {
            fixed_native_fee,
            transfer_fee_bps,
        };
        fees.validate()?;
        self.fees = fees;
        self.events.emit(DlnEvent::GlobalFeeUpdated {
            fixed_native_fee,
            transfer_fee_bps,
        });
        Ok(())
    }

    /// Pay out and zero the collected fees of each listed token.
    pub fn withdraw_fee(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        tokens: &[Address],
        recipient: &Address,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        let mut withdrawn = Vec::new();
        for token in tokens {
            let amount = self.collected_fee(token);
            if amount > 0 && !withdrawn.iter().any(|(t, _)| t == token) {
                withdrawn.push((token.clone(), amount));
            }
        }

        let escrow = self.address.clone();
        assets.atomically(|book| {
            for (token, amount) in &withdrawn {
                book.transfer(&escrow, recipient, token, *amount)?;
            }
            Ok(())
        })?;

        for (token, amount) in withdrawn {
            self.collected_fee.insert(token.clone(), 0);
            tracing::info!(token = %token, recipient = %recipient, amount, "Fee withdrawn");
            self.events.emit(DlnEvent::FeeWithdrawn {
                token,
                recipient: recipient.clone(),
                amount,
            });
        }
        Ok(())
    }

    pub fn set_call_proxy(&mut self, ctx: &CallContext, call_proxy: Address) -> Result<()> {
        self.require_admin(ctx)?;
        self.call_proxy = call_proxy;
        Ok(())
    }

    pub(crate) fn require_admin(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller == self.admin {
            Ok(())
        } else {
            Err(CrosslockError::AdminBadRole)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> DlnSource {
        DlnSource::new(
            ChainId(1),
            Address::evm_filled(0x5c),
            Address::evm_filled(0xad),
            Address::evm_filled(0xcc),
            FeeConfig::default(),
        )
    }

    #[test]
    fn admin_only() {
        let mut src = ledger();
        let outsider = CallContext::new(Address::evm_filled(0x01));
        assert_eq!(
            src.update_global_fee(&outsider, 1, 1).unwrap_err(),
            CrosslockError::AdminBadRole
        );
        assert_eq!(
            src.set_dln_destination_address(
                &outsider,
                ChainId(56),
                Address::evm_filled(0xd5),
                ChainEngine::Evm
            )
            .unwrap_err(),
            CrosslockError::AdminBadRole
        );
    }

    #[test]
    fn fee_bps_capped() {
        let mut src = ledger();
        let admin = CallContext::new(Address::evm_filled(0xad));
        let err = src.update_global_fee(&admin, 5, 10_001).unwrap_err();
        assert!(err.to_string().starts_with("CL_ERR_104"));

        src.update_global_fee(&admin, 5, 10_000).unwrap();
        assert_eq!(src.fees().transfer_fee_bps, 10_000);
        assert_eq!(src.events().count("GlobalFeeUpdated"), 1);
    }

    #[test]
    fn peer_address_checked_against_engine() {
        let mut src = ledger();
        let admin = CallContext::new(Address::evm_filled(0xad));
        let err = src
            .set_dln_destination_address(
                &admin,
                ChainId::SOLANA,
                Address::evm_filled(0x01),
                ChainEngine::Solana,
            )
            .unwrap_err();
        assert!(matches!(err, CrosslockError::WrongAddressLength { .. }));

        src.set_dln_destination_address(
            &admin,
            ChainId::SOLANA,
            Address::solana_filled(0x01),
            ChainEngine::Solana,
        )
        .unwrap();
        assert_eq!(
            src.dln_destination_address(ChainId::SOLANA).unwrap().engine,
            ChainEngine::Solana
        );
    }

    #[test]
    fn withdraw_moves_and_zeroes_fees() {
        let mut src = ledger();
        let mut assets = AssetBook::new();
        let token = Address::evm_filled(0x11);
        assets.mint(&src.address, &token, 50);
        src.collected_fee.insert(token.clone(), 30);

        let admin = CallContext::new(Address::evm_filled(0xad));
        let treasury = Address::evm_filled(0x7e);
        src.withdraw_fee(&mut assets, &admin, &[token.clone(), token.clone()], &treasury)
            .unwrap();

        assert_eq!(assets.balance(&treasury, &token), 30);
        assert_eq!(src.collected_fee(&token), 0);
        assert_eq!(src.events().count("FeeWithdrawn"), 1);
    }
}
