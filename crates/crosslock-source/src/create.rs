//! Order creation and give-amount patches.
//!
//! Every entry point validates in full before it touches the asset book:
//!
//! 1. Take chain has a registered peer
//! 2. Address lengths (take-side fields against the peer's engine)
//! 3. External call envelope, affiliate and permit envelopes decode
//! 4. Attached native value is exact
//! 5. Fees fit in the give amount
//! 6. The order id slot is free
//!
//! Only then is the escrow pulled, inside one atomic block.

use crosslock_orderlib::{
    AffiliateFee, ExternalCallEnvelope, PermitEnvelope, apply_creation_fee, apply_patch_fee,
    derive_order_id, validate_address, validate_optional_address,
};
use crosslock_runtime::{AssetBook, CallContext};
use crosslock_types::{
    Address, Amount, ChainEngine, CrosslockError, DlnEvent, GiveOrderState, GiveOrderStatus,
    Order, OrderCreation, OrderId, Result,
};

use crate::ledger::DlnSource;

impl DlnSource {
    /// Create an order using the maker's auto-incrementing nonce.
    ///
    /// `affiliate_fee` and `permit` are encoded envelopes; empty means none.
    pub fn create_order(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        creation: &OrderCreation,
        affiliate_fee: &[u8],
        referral_code: u32,
        permit: &[u8],
    ) -> Result<OrderId> {
        let nonce = self.master_nonce(&ctx.caller);
        let order_id = self.create(
            assets,
            ctx,
            creation,
            nonce,
            affiliate_fee,
            referral_code,
            permit,
            &[],
        )?;
        self.master_nonce.insert(ctx.caller.clone(), nonce + 1);
        Ok(order_id)
    }

    /// Create an order with a maker-chosen nonce and an opaque payload.
    /// Reusing a salt for identical terms yields the same id and fails.
    pub fn create_salted_order(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        creation: &OrderCreation,
        salt: u64,
        affiliate_fee: &[u8],
        referral_code: u32,
        permit: &[u8],
        payload: &[u8],
    ) -> Result<OrderId> {
        self.create(
            assets,
            ctx,
            creation,
            salt,
            affiliate_fee,
            referral_code,
            permit,
            payload,
        )
    }

    fn create(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        creation: &OrderCreation,
        nonce: u64,
        affiliate_fee: &[u8],
        referral_code: u32,
        permit: &[u8],
        payload: &[u8],
    ) -> Result<OrderId> {
        let peer = self
            .dln_destinations
            .get(&creation.take_chain_id)
            .ok_or(CrosslockError::NotSupportedDstChain(creation.take_chain_id))?;
        let take_engine = peer.engine;

        validate_address("take_token_address", &creation.take_token_address, take_engine)?;
        validate_address("receiver_dst", &creation.receiver_dst, take_engine)?;
        validate_address(
            "order_authority_address_dst",
            &creation.order_authority_address_dst,
            take_engine,
        )?;
        validate_optional_address(
            "allowed_taker_dst",
            creation.allowed_taker_dst.as_ref(),
            take_engine,
        )?;
        validate_address("give_token_address", &creation.give_token_address, ChainEngine::Evm)?;
        validate_address(
            "give_patch_authority_src",
            &creation.give_patch_authority_src,
            ChainEngine::Evm,
        )?;
        validate_optional_address(
            "allowed_cancel_beneficiary_src",
            creation.allowed_cancel_beneficiary_src.as_ref(),
            ChainEngine::Evm,
        )?;

        if take_engine == ChainEngine::Evm {
            if let Some(external_call) = &creation.external_call {
                ExternalCallEnvelope::decode(external_call)?;
            }
        }
        let affiliate = AffiliateFee::decode(affiliate_fee)?;
        let permit = PermitEnvelope::decode(permit)?;

        // Native value: fixed fee, plus the give amount for native orders.
        let fixed_fee = self.fees.fixed_native_fee;
        let native_give = assets.is_native(&creation.give_token_address);
        if native_give {
            let expected = creation
                .give_amount
                .checked_add(fixed_fee)
                .ok_or(CrosslockError::ArithmeticOverflow)?;
            if ctx.value != expected {
                return Err(CrosslockError::MismatchNativeGiveAmount);
            }
        } else if ctx.value != fixed_fee {
            return Err(CrosslockError::WrongFixedFee {
                actual: ctx.value,
                expected: fixed_fee,
            });
        }

        let affiliate_amount = affiliate.as_ref().map_or(0, |a| a.amount);
        let fee = apply_creation_fee(
            creation.give_amount,
            affiliate_amount,
            self.fees.transfer_fee_bps,
        )?;

        let order = Order {
            maker_order_nonce: nonce,
            maker_src: ctx.caller.clone(),
            give_chain_id: self.chain_id,
            give_token_address: creation.give_token_address.clone(),
            give_amount: fee.net_give_amount,
            take_chain_id: creation.take_chain_id,
            take_token_address: creation.take_token_address.clone(),
            take_amount: creation.take_amount,
            receiver_dst: creation.receiver_dst.clone(),
            give_patch_authority_src: creation.give_patch_authority_src.clone(),
            order_authority_address_dst: creation.order_authority_address_dst.clone(),
            allowed_taker_dst: creation.allowed_taker_dst.clone(),
            allowed_cancel_beneficiary_src: creation.allowed_cancel_beneficiary_src.clone(),
            external_call: creation.external_call.clone(),
        };
        let order_id = derive_order_id(&order);
        if self.give_order_status(&order_id) != GiveOrderStatus::NotSet {
            return Err(CrosslockError::IncorrectOrderStatus);
        }

        self.pull(
            assets,
            ctx,
            &creation.give_token_address,
            creation.give_amount,
            permit.as_ref(),
        )?;

        self.give_orders.insert(
            order_id,
            GiveOrderState {
                status: GiveOrderStatus::Created,
                give_token_address: order.give_token_address.clone(),
                native_fix_fee: fixed_fee,
                take_chain_id: order.take_chain_id,
                percent_fee: fee.percent_fee,
                give_amount: order.give_amount,
                affiliate_beneficiary: affiliate.as_ref().map(|a| a.beneficiary.clone()),
                affiliate_amount,
                allowed_cancel_beneficiary: order.allowed_cancel_beneficiary_src.clone(),
            },
        );

        tracing::info!(
            order_id = %order_id.short(),
            maker = %order.maker_src,
            take_chain = %order.take_chain_id,
            give_amount = order.give_amount,
            percent_fee = fee.percent_fee,
            "Order created"
        );
        self.events.emit(DlnEvent::CreatedOrder {
            order,
            order_id,
            affiliate_fee: affiliate_fee.to_vec(),
            native_fix_fee: fixed_fee,
            percent_fee: fee.percent_fee,
            referral_code,
            payload: payload.to_vec(),
        });
        Ok(order_id)
    }

    /// Increase an order's give amount. The increment is netted through
    /// the percent fee; the running totals grow in both the order state and
    /// the patch ledger.
    pub fn patch_order_give(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order: &Order,
        added_amount: Amount,
        permit: &[u8],
    ) -> Result<()> {
        let order_id = derive_order_id(order);
        if ctx.caller != order.give_patch_authority_src {
            return Err(CrosslockError::Unauthorized);
        }
        if added_amount == 0 {
            return Err(CrosslockError::wrong_argument("patch amount must be positive"));
        }
        if self.give_order_status(&order_id) != GiveOrderStatus::Created {
            return Err(CrosslockError::IncorrectOrderStatus);
        }
        let expected_value = if assets.is_native(&order.give_token_address) {
            added_amount
        } else {
            0
        };
        if ctx.value != expected_value {
            return Err(CrosslockError::MismatchNativeGiveAmount);
        }
        let permit = PermitEnvelope::decode(permit)?;
        let fee = apply_patch_fee(added_amount, self.fees.transfer_fee_bps)?;

        let patched = self
            .give_patch(&order_id)
            .checked_add(fee.net_added_amount)
            .ok_or(CrosslockError::ArithmeticOverflow)?;
        let state = self
            .give_orders
            .get(&order_id)
            .ok_or_else(|| CrosslockError::Internal("patched order vanished".into()))?;
        let give_amount = state
            .give_amount
            .checked_add(fee.net_added_amount)
            .ok_or(CrosslockError::ArithmeticOverflow)?;
        let percent_fee = state
            .percent_fee
            .checked_add(fee.percent_fee)
            .ok_or(CrosslockError::ArithmeticOverflow)?;

        self.pull(
            assets,
            ctx,
            &order.give_token_address,
            added_amount,
            permit.as_ref(),
        )?;

        self.give_patches.insert(order_id, patched);
        let state = self
            .give_orders
            .get_mut(&order_id)
            .ok_or_else(|| CrosslockError::Internal("patched order vanished".into()))?;
        state.give_amount = give_amount;
        state.percent_fee = percent_fee;

        tracing::info!(
            order_id = %order_id.short(),
            added = fee.net_added_amount,
            give_amount = state.give_amount,
            "Give amount increased"
        );
        self.events.emit(DlnEvent::IncreasedGiveAmount {
            order_id,
            order_give_final_amount: state.give_amount,
            final_percent_fee: state.percent_fee,
        });
        Ok(())
    }

    /// Move the attached native value and `amount` of a token give asset
    /// into escrow. Native give amounts arrive as part of the value.
    fn pull(
        &self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        token: &Address,
        amount: Amount,
        permit: Option<&PermitEnvelope>,
    ) -> Result<()> {
        let escrow = &self.address;
        assets.atomically(|book| {
            let native = book.native_asset().clone();
            book.transfer(&ctx.caller, escrow, &native, ctx.value)?;
            if book.is_native(token) {
                return Ok(());
            }
            if let Some(permit) = permit {
                book.permit(&ctx.caller, escrow, token, permit, ctx.now)?;
            }
            book.transfer_from(escrow, &ctx.caller, escrow, token, amount)
        })
    }
}
