//! Fulfillment and take-amount patches.

use crosslock_adapter::CallFunds;
use crosslock_orderlib::{PermitEnvelope, derive_order_id};
use crosslock_runtime::{AssetBook, CallContext};
use crosslock_types::{
    Address, Amount, CrosslockError, DlnEvent, Order, OrderId, Result, TakeOrderState,
    TakeOrderStatus,
};

use crate::ledger::DlnDestination;

impl DlnDestination {
    /// Deliver the take asset for `order`.
    ///
    /// 1. Check chain, id, status, taker restriction, source peer, amount
    ///    and attached native value
    /// 2. Pay the receiver, or the external call adapter when the order
    ///    carries an external call
    /// 3. Record FULFILLED with `unlock_authority` as the party entitled to
    ///    send the unlock
    ///
    /// # Errors
    /// `WrongChain`, `MismatchedOrderId`, `IncorrectOrderStatus`,
    /// `Unauthorized`, `NotSupportedSrcChain`, `WrongArgument`,
    /// `MismatchNativeTakeAmount`, in that order, plus asset errors.
    pub fn fulfill_order(
        &mut self,
        assets: &mut AssetBook,
        ctx: &CallContext,
        order: &Order,
        fulfill_amount: Amount,
        order_id: &OrderId,
        permit: &[u8],
        unlock_authority: &Address,
        external_call_reward_beneficiary: &Address,
    ) -> Result<()> {
        if order.take_chain_id != self.chain_id {
            return Err(CrosslockError::WrongChain);
        }
        if derive_order_id(order) != *order_id {
            return Err(CrosslockError::MismatchedOrderId);
        }
        if self.take_order_status(order_id) != TakeOrderStatus::NotSet {
            return Err(CrosslockError::IncorrectOrderStatus);
        }
        if let Some(taker) = order.allowed_taker_dst.as_ref().filter(|a| !a.is_empty()) {
            if taker != unlock_authority {
                return Err(CrosslockError::Unauthorized);
            }
        }
        if !self.dln_sources.contains_key(&order.give_chain_id) {
            return Err(CrosslockError::NotSupportedSrcChain(order.give_chain_id));
        }
        let expected = order.take_amount - self.take_patch(order_id);
        if fulfill_amount != expected {
            return Err(CrosslockError::wrong_argument(format!(
                "fulfill amount {fulfill_amount} differs from take amount {expected}"
            )));
        }
        let native_take = assets.is_native(&order.take_token_address);
        let expected_value = if native_take { fulfill_amount } else { 0 };
        if ctx.value != expected_value {
            return Err(CrosslockError::MismatchNativeTakeAmount);
        }
        let permit = PermitEnvelope::decode(permit)?;

        let external_call = order.external_call.as_deref().filter(|c| !c.is_empty());
        let recipient = match (external_call, &self.adapter) {
            (None, _) => order.receiver_dst.clone(),
            (Some(_), Some(adapter)) => adapter.address().clone(),
            (Some(_), None) => {
                return Err(CrosslockError::InvalidExternalCall {
                    reason: "no external call adapter installed".into(),
                });
            }
        };

        let spender = self.address.clone();
        let adapter = self.adapter.as_mut();
        assets.atomically(|book| {
            if native_take {
                book.transfer(&ctx.caller, &recipient, &order.take_token_address, fulfill_amount)?;
            } else {
                if let Some(permit) = &permit {
                    book.permit(&ctx.caller, &spender, &order.take_token_address, permit, ctx.now)?;
                }
                book.transfer_from(
                    &spender,
                    &ctx.caller,
                    &recipient,
                    &order.take_token_address,
                    fulfill_amount,
                )?;
            }
            if let (Some(call), Some(adapter)) = (external_call, adapter) {
                let funds = CallFunds {
                    order_id: *order_id,
                    call_authority: &order.order_authority_address_dst,
                    token: &order.take_token_address,
                    amount: fulfill_amount,
                };
                let as_ledger = CallContext::new(spender.clone()).at(ctx.now);
                adapter.receive_call(book, &as_ledger, funds, call, external_call_reward_beneficiary)?;
            }
            Ok(())
        })?;

        self.take_orders.insert(
            *order_id,
            TakeOrderState {
                status: TakeOrderStatus::Fulfilled,
                taker_address: unlock_authority.clone(),
                give_chain_id: order.give_chain_id,
            },
        );
        tracing::info!(
            order_id = %order_id.short(),
            taker = %ctx.caller,
            unlock_authority = %unlock_authority,
            amount = fulfill_amount,
            external_call = external_call.is_some(),
            "Order fulfilled"
        );
        self.events.emit(DlnEvent::FulfilledOrder {
            order: order.clone(),
            order_id: *order_id,
            sender: ctx.caller.clone(),
            unlock_authority: unlock_authority.clone(),
        });
        Ok(())
    }

    /// Set the discount on an unfulfilled order's take amount. Each patch
    /// must raise the discount and leave a positive take amount.
    pub fn patch_order_take(
        &mut self,
        ctx: &CallContext,
        order: &Order,
        new_subtrahend: Amount,
    ) -> Result<()> {
        if order.take_chain_id != self.chain_id {
            return Err(CrosslockError::WrongChain);
        }
        if ctx.caller != order.order_authority_address_dst {
            return Err(CrosslockError::Unauthorized);
        }
        let order_id = derive_order_id(order);
        let current = self.take_patch(&order_id);
        if new_subtrahend <= current || new_subtrahend >= order.take_amount {
            return Err(CrosslockError::wrong_argument(format!(
                "subtrahend {new_subtrahend} must exceed {current} and stay below {}",
                order.take_amount
            )));
        }
        if self.take_order_status(&order_id) != TakeOrderStatus::NotSet {
            return Err(CrosslockError::IncorrectOrderStatus);
        }

        self.take_patches.insert(order_id, new_subtrahend);
        let order_take_final_amount = order.take_amount - new_subtrahend;
        tracing::info!(order_id = %order_id.short(), take_amount = order_take_final_amount, "Take amount decreased");
        self.events.emit(DlnEvent::DecreasedTakeAmount {
            order_id,
            order_take_final_amount,
        });
        Ok(())
    }
}
