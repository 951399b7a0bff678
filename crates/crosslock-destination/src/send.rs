//! Outbound settlement: unlock and cancel instructions sent to the give
//! side through the message bus.
//!
//! EVM-style give chains receive a [`SourceInstruction`]. Account-model
//! (Solana-style) give chains receive a batch of program instructions: a
//! wallet-initialization instruction followed by one claim per order, all
//! settling a single give asset.
//!
//! Every send checks the whole batch, moves the attached native value to
//! the bus treasury and sends one message, then marks the orders.

use std::collections::HashSet;

use crosslock_orderlib::instruction::{
    encode_solana_batch, encode_solana_claim_cancel, encode_solana_claim_unlock,
    encode_solana_init_wallet_if_needed,
};
use crosslock_orderlib::{SourceInstruction, derive_order_id, validate_address, validate_solana_rewards};
use crosslock_runtime::{AssetBook, CallContext, MessageBus, OutboundMessage};
use crosslock_types::{
    Address, Amount, ChainEngine, ChainId, CrosslockError, DlnEvent, Order, OrderId, PeerConfig,
    Result, SubmissionId, TakeOrderState, TakeOrderStatus,
};

use crate::ledger::DlnDestination;

impl DlnDestination {
    // -----------------------------------------------------------------
    // Unlock
    // -----------------------------------------------------------------

    pub fn send_evm_unlock<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        order_id: &OrderId,
        beneficiary: &Address,
        execution_fee: Amount,
    ) -> Result<SubmissionId> {
        let ids = std::slice::from_ref(order_id);
        let (give_chain_id, peer) = self.check_unlock_batch(ctx, ids, ChainEngine::Evm)?;
        let data = SourceInstruction::ClaimUnlock {
            order_id: *order_id,
            beneficiary: beneficiary.clone(),
        }
        .encode();
        self.dispatch_unlock(assets, bus, ctx, ids, give_chain_id, &peer, beneficiary, execution_fee, data)
    }

    /// Send one unlock message covering every order in `order_ids`.
    ///
    /// # Errors
    /// `UnexpectedBatchSize`, `IncorrectOrderStatus` (also for duplicates),
    /// `Unauthorized`, `WrongChain`, `WrongAddressLength`,
    /// `TransferAmountNotCoverFees`.
    pub fn send_batch_evm_unlock<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        order_ids: &[OrderId],
        beneficiary: &Address,
        execution_fee: Amount,
    ) -> Result<SubmissionId> {
        let (give_chain_id, peer) = self.check_unlock_batch(ctx, order_ids, ChainEngine::Evm)?;
        let data = SourceInstruction::ClaimBatchUnlock {
            order_ids: order_ids.to_vec(),
            beneficiary: beneficiary.clone(),
        }
        .encode();
        self.dispatch_unlock(assets, bus, ctx, order_ids, give_chain_id, &peer, beneficiary, execution_fee, data)
    }

    pub fn send_solana_unlock<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        order: &Order,
        beneficiary: &Address,
        execution_fee: Amount,
        init_wallet_reward: u64,
        claim_reward: u64,
    ) -> Result<SubmissionId> {
        self.send_batch_solana_unlock(
            assets,
            bus,
            ctx,
            std::slice::from_ref(order),
            beneficiary,
            execution_fee,
            init_wallet_reward,
            claim_reward,
        )
    }

    /// Unlock a batch of orders on an account-model give chain. All orders
    /// must share the give chain and the give asset, and the smallest order
    /// must be able to pay the instruction rewards.
    pub fn send_batch_solana_unlock<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        orders: &[Order],
        beneficiary: &Address,
        execution_fee: Amount,
        init_wallet_reward: u64,
        claim_reward: u64,
    ) -> Result<SubmissionId> {
        let order_ids: Vec<OrderId> = orders.iter().map(derive_order_id).collect();
        let (give_chain_id, peer) = self.check_unlock_batch(ctx, &order_ids, ChainEngine::Solana)?;
        let (give_token, smallest) = single_give_token(orders)?;
        validate_address("give_token_address", give_token, ChainEngine::Solana)?;

        let fees = bus.fees();
        validate_solana_rewards(
            smallest,
            execution_fee,
            fees.fixed_native_fee,
            fees.transfer_fee_bps,
            init_wallet_reward,
            claim_reward,
        )?;

        let mut instructions = vec![encode_solana_init_wallet_if_needed(
            beneficiary,
            give_token,
            init_wallet_reward,
        )];
        for order_id in &order_ids {
            instructions.push(encode_solana_claim_unlock(
                self.chain_id,
                &peer.address,
                beneficiary,
                give_token,
                order_id,
                claim_reward,
            ));
        }
        let data = encode_solana_batch(&instructions);
        self.dispatch_unlock(assets, bus, ctx, &order_ids, give_chain_id, &peer, beneficiary, execution_fee, data)
    }

    /// Validate an unlock batch and return its give chain and peer.
    fn check_unlock_batch(
        &self,
        ctx: &CallContext,
        order_ids: &[OrderId],
        engine: ChainEngine,
    ) -> Result<(ChainId, PeerConfig)> {
        let max = self.limits.for_engine(engine);
        if order_ids.is_empty() || order_ids.len() > max {
            return Err(CrosslockError::UnexpectedBatchSize {
                size: order_ids.len(),
                max,
            });
        }

        let mut seen = HashSet::with_capacity(order_ids.len());
        let mut give_chain_id = None;
        for order_id in order_ids {
            let state = self
                .take_orders
                .get(order_id)
                .filter(|s| s.status == TakeOrderStatus::Fulfilled)
                .ok_or(CrosslockError::IncorrectOrderStatus)?;
            if !seen.insert(*order_id) {
                return Err(CrosslockError::IncorrectOrderStatus);
            }
            if state.taker_address != ctx.caller {
                return Err(CrosslockError::Unauthorized);
            }
            match give_chain_id {
                None => give_chain_id = Some(state.give_chain_id),
                Some(chain) if chain != state.give_chain_id => {
                    return Err(CrosslockError::WrongChain);
                }
                Some(_) => {}
            }
        }

        let chain = give_chain_id.ok_or(CrosslockError::IncorrectOrderStatus)?;
        let peer = self.peer_for(chain, engine)?;
        Ok((chain, peer))
    }

    fn dispatch_unlock<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        order_ids: &[OrderId],
        give_chain_id: ChainId,
        peer: &PeerConfig,
        beneficiary: &Address,
        execution_fee: Amount,
        data: Vec<u8>,
    ) -> Result<SubmissionId> {
        validate_address("beneficiary", beneficiary, peer.engine)?;
        let submission_id =
            self.send_message(assets, bus, ctx, give_chain_id, peer, execution_fee, data)?;

        for order_id in order_ids {
            if let Some(state) = self.take_orders.get_mut(order_id) {
                state.status = TakeOrderStatus::SentUnlock;
            }
            self.events.emit(DlnEvent::SentOrderUnlock {
                order_id: *order_id,
                beneficiary: beneficiary.clone(),
                submission_id,
            });
        }
        tracing::info!(
            submission = %submission_id,
            to = %give_chain_id,
            orders = order_ids.len(),
            beneficiary = %beneficiary,
            "Unlock sent"
        );
        Ok(submission_id)
    }

    // -----------------------------------------------------------------
    // Cancel
    // -----------------------------------------------------------------

    pub fn send_evm_order_cancel<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        order: &Order,
        cancel_beneficiary: &Address,
        execution_fee: Amount,
    ) -> Result<SubmissionId> {
        let orders = std::slice::from_ref(order);
        let (order_ids, peer) = self.check_cancel_batch(ctx, orders, ChainEngine::Evm)?;
        let beneficiary = resolve_cancel_beneficiary(order, cancel_beneficiary);
        let data = SourceInstruction::ClaimCancel {
            order_id: order_ids[0],
            beneficiary: beneficiary.clone(),
        }
        .encode();
        self.dispatch_cancel(assets, bus, ctx, orders, &order_ids, &peer, &beneficiary, execution_fee, data)
    }

    /// Cancel several unfulfilled orders with one message. Each order's own
    /// cancel-beneficiary restriction must agree with `cancel_beneficiary`.
    pub fn send_batch_evm_order_cancel<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        orders: &[Order],
        cancel_beneficiary: &Address,
        execution_fee: Amount,
    ) -> Result<SubmissionId> {
        let (order_ids, peer) = self.check_cancel_batch(ctx, orders, ChainEngine::Evm)?;
        if orders
            .iter()
            .any(|o| resolve_cancel_beneficiary(o, cancel_beneficiary) != *cancel_beneficiary)
        {
            return Err(CrosslockError::wrong_argument(
                "order restricts its cancel beneficiary",
            ));
        }
        let data = SourceInstruction::ClaimBatchCancel {
            order_ids: order_ids.clone(),
            beneficiary: cancel_beneficiary.clone(),
        }
        .encode();
        self.dispatch_cancel(assets, bus, ctx, orders, &order_ids, &peer, cancel_beneficiary, execution_fee, data)
    }

    pub fn send_solana_order_cancel<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        order: &Order,
        cancel_beneficiary: &Address,
        execution_fee: Amount,
        init_wallet_reward: u64,
        claim_reward: u64,
    ) -> Result<SubmissionId> {
        let orders = std::slice::from_ref(order);
        let (order_ids, peer) = self.check_cancel_batch(ctx, orders, ChainEngine::Solana)?;
        validate_address("give_token_address", &order.give_token_address, ChainEngine::Solana)?;
        let fees = bus.fees();
        validate_solana_rewards(
            order.give_amount,
            execution_fee,
            fees.fixed_native_fee,
            fees.transfer_fee_bps,
            init_wallet_reward,
            claim_reward,
        )?;

        let beneficiary = resolve_cancel_beneficiary(order, cancel_beneficiary);
        let data = encode_solana_batch(&[
            encode_solana_init_wallet_if_needed(
                &beneficiary,
                &order.give_token_address,
                init_wallet_reward,
            ),
            encode_solana_claim_cancel(
                self.chain_id,
                &peer.address,
                &beneficiary,
                &order.give_token_address,
                &order_ids[0],
                claim_reward,
            ),
        ]);
        self.dispatch_cancel(assets, bus, ctx, orders, &order_ids, &peer, &beneficiary, execution_fee, data)
    }

    /// Validate a cancel batch and return the order ids and give-side peer.
    fn check_cancel_batch(
        &self,
        ctx: &CallContext,
        orders: &[Order],
        engine: ChainEngine,
    ) -> Result<(Vec<OrderId>, PeerConfig)> {
        let max = self.limits.for_engine(engine);
        if orders.is_empty() || orders.len() > max {
            return Err(CrosslockError::UnexpectedBatchSize {
                size: orders.len(),
                max,
            });
        }

        let give_chain_id = orders[0].give_chain_id;
        let mut order_ids = Vec::with_capacity(orders.len());
        for order in orders {
            if order.take_chain_id != self.chain_id {
                return Err(CrosslockError::WrongChain);
            }
            if ctx.caller != order.order_authority_address_dst {
                return Err(CrosslockError::Unauthorized);
            }
            let order_id = derive_order_id(order);
            if self.take_order_status(&order_id) != TakeOrderStatus::NotSet
                || order_ids.contains(&order_id)
            {
                return Err(CrosslockError::IncorrectOrderStatus);
            }
            if order.give_chain_id != give_chain_id {
                return Err(CrosslockError::WrongChain);
            }
            order_ids.push(order_id);
        }

        let peer = self.peer_for(give_chain_id, engine)?;
        Ok((order_ids, peer))
    }

    fn dispatch_cancel<B: MessageBus + ?Sized>(
        &mut self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        orders: &[Order],
        order_ids: &[OrderId],
        peer: &PeerConfig,
        cancel_beneficiary: &Address,
        execution_fee: Amount,
        data: Vec<u8>,
    ) -> Result<SubmissionId> {
        validate_address("cancel_beneficiary", cancel_beneficiary, peer.engine)?;
        let give_chain_id = orders[0].give_chain_id;
        let submission_id =
            self.send_message(assets, bus, ctx, give_chain_id, peer, execution_fee, data)?;

        for (order, order_id) in orders.iter().zip(order_ids) {
            self.take_orders.insert(
                *order_id,
                TakeOrderState {
                    status: TakeOrderStatus::SentCancel,
                    taker_address: Address::zero(),
                    give_chain_id: order.give_chain_id,
                },
            );
            self.events.emit(DlnEvent::SentOrderCancel {
                order_id: *order_id,
                cancel_beneficiary: cancel_beneficiary.clone(),
                submission_id,
            });
        }
        tracing::info!(
            submission = %submission_id,
            to = %give_chain_id,
            orders = order_ids.len(),
            beneficiary = %cancel_beneficiary,
            "Cancel sent"
        );
        Ok(submission_id)
    }

    // -----------------------------------------------------------------
    // Shared
    // -----------------------------------------------------------------

    fn peer_for(&self, give_chain_id: ChainId, engine: ChainEngine) -> Result<PeerConfig> {
        let peer = self
            .dln_sources
            .get(&give_chain_id)
            .ok_or(CrosslockError::NotSupportedSrcChain(give_chain_id))?;
        if peer.engine != engine {
            return Err(CrosslockError::WrongChain);
        }
        Ok(peer.clone())
    }

    /// Pay the bus and send. The value must cover the bus fixed fee plus
    /// the execution fee promised to the claimer.
    fn send_message<B: MessageBus + ?Sized>(
        &self,
        assets: &mut AssetBook,
        bus: &mut B,
        ctx: &CallContext,
        chain_id_to: ChainId,
        peer: &PeerConfig,
        execution_fee: Amount,
        data: Vec<u8>,
    ) -> Result<SubmissionId> {
        let required = bus
            .fees()
            .fixed_native_fee
            .checked_add(execution_fee)
            .ok_or(CrosslockError::ArithmeticOverflow)?;
        if ctx.value < required {
            return Err(CrosslockError::TransferAmountNotCoverFees);
        }

        let message = OutboundMessage {
            chain_id_from: self.chain_id,
            chain_id_to,
            sender: self.address.clone(),
            receiver: peer.address.clone(),
            data,
            execution_fee,
        };
        assets.atomically(|book| {
            let native = book.native_asset().clone();
            book.transfer(&ctx.caller, &bus.treasury(), &native, ctx.value)?;
            bus.send(message)
        })
    }
}

/// The give asset shared by every order, and the smallest give amount.
fn single_give_token(orders: &[Order]) -> Result<(&Address, Amount)> {
    let first = orders.first().ok_or(CrosslockError::UnexpectedBatchSize {
        size: 0,
        max: 0,
    })?;
    let mut smallest = first.give_amount;
    for order in &orders[1..] {
        if order.give_token_address != first.give_token_address {
            return Err(CrosslockError::WrongToken);
        }
        smallest = smallest.min(order.give_amount);
    }
    Ok((&first.give_token_address, smallest))
}

/// An order that restricts its cancel beneficiary always cancels to it.
fn resolve_cancel_beneficiary(order: &Order, requested: &Address) -> Address {
    order
        .allowed_cancel_beneficiary_src
        .clone()
        .filter(|a| !a.is_zero())
        .unwrap_or_else(|| requested.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslock_runtime::LoopbackGate;
    use crosslock_types::{BusFeeConfig, constants};
    use ed25519_dalek::SigningKey;

    const TAKE_CHAIN: ChainId = ChainId(56);
    const EVM_GIVE: ChainId = ChainId(1);
    const BUS_FEE: Amount = 500;

    struct Fixture {
        dst: DlnDestination,
        assets: AssetBook,
        gate: LoopbackGate,
        taker: Address,
    }

    fn admin() -> Address {
        Address::evm_filled(0xad)
    }

    fn fixture() -> Fixture {
        let mut dst = DlnDestination::new(TAKE_CHAIN, Address::evm_filled(0xd5), admin());
        let ctx = CallContext::new(admin());
        dst.set_dln_source_address(&ctx, EVM_GIVE, Address::evm_filled(0x5c), ChainEngine::Evm)
            .unwrap();
        dst.set_dln_source_address(&ctx, ChainId::SOLANA, Address::solana_filled(0x50), ChainEngine::Solana)
            .unwrap();

        let gate = LoopbackGate::new(
            BusFeeConfig {
                fixed_native_fee: BUS_FEE,
                transfer_fee_bps: 10,
            },
            Address::evm_filled(0x7e),
            Address::evm_filled(0xcc),
            vec![SigningKey::from_bytes(&[1; 32])],
            1,
        )
        .unwrap();
        let mut assets = AssetBook::new();
        let taker = Address::evm_filled(0x7a);
        let native = assets.native_asset().clone();
        assets.mint(&taker, &native, 1_000_000);
        Fixture {
            dst,
            assets,
            gate,
            taker,
        }
    }

    fn order(nonce: u64, give_chain: ChainId, give_token: Address, give_amount: Amount) -> Order {
        Order {
            maker_order_nonce: nonce,
            maker_src: Address::evm_filled(0xa1),
            give_chain_id: give_chain,
            give_token_address: give_token,
            give_amount,
            take_chain_id: TAKE_CHAIN,
            take_token_address: Address::evm_filled(0x22),
            take_amount: 100,
            receiver_dst: Address::evm_filled(0xd1),
            give_patch_authority_src: Address::evm_filled(0xa1),
            order_authority_address_dst: Address::evm_filled(0xa2),
            allowed_taker_dst: None,
            allowed_cancel_beneficiary_src: None,
            external_call: None,
        }
    }

    /// Record a fulfilled order directly, bypassing asset movement.
    fn fulfilled(f: &mut Fixture, o: &Order) -> OrderId {
        let id = derive_order_id(o);
        f.dst.take_orders.insert(
            id,
            TakeOrderState {
                status: TakeOrderStatus::Fulfilled,
                taker_address: f.taker.clone(),
                give_chain_id: o.give_chain_id,
            },
        );
        id
    }

    fn paid(f: &Fixture, value: Amount) -> CallContext {
        CallContext::new(f.taker.clone()).with_value(value)
    }

    #[test]
    fn evm_batch_unlock_sends_one_message() {
        let mut f = fixture();
        let ids: Vec<OrderId> = (0..3)
            .map(|n| {
                let o = order(n, EVM_GIVE, Address::evm_filled(0x11), 1_000);
                fulfilled(&mut f, &o)
            })
            .collect();
        let beneficiary = Address::evm_filled(0xbe);
        let ctx = paid(&f, BUS_FEE + 20);

        let sub = f
            .dst
            .send_batch_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &ids, &beneficiary, 20)
            .unwrap();

        assert_eq!(f.gate.outbox(), &[sub]);
        let message = &f.gate.submission(&sub).unwrap().message;
        assert_eq!(message.chain_id_to, EVM_GIVE);
        assert_eq!(message.receiver, Address::evm_filled(0x5c));
        assert_eq!(
            SourceInstruction::decode(&message.data).unwrap(),
            SourceInstruction::ClaimBatchUnlock {
                order_ids: ids.clone(),
                beneficiary,
            }
        );
        for id in &ids {
            assert_eq!(f.dst.take_order_status(id), TakeOrderStatus::SentUnlock);
        }
        assert_eq!(f.dst.events().count("SentOrderUnlock"), 3);
        assert_eq!(
            f.assets.balance(&Address::evm_filled(0x7e), f.assets.native_asset()),
            BUS_FEE + 20
        );
    }

    #[test]
    fn evm_batch_rejections() {
        let mut f = fixture();
        let a = fulfilled(&mut f, &order(0, EVM_GIVE, Address::evm_filled(0x11), 1_000));
        let b = Address::evm_filled(0xbe);
        let ctx = paid(&f, BUS_FEE);

        let err = f
            .dst
            .send_batch_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &[], &b, 0)
            .unwrap_err();
        assert_eq!(err, CrosslockError::UnexpectedBatchSize { size: 0, max: 10 });

        let too_many = vec![a; constants::DEFAULT_MAX_EVM_UNLOCK_BATCH + 1];
        assert!(matches!(
            f.dst
                .send_batch_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &too_many, &b, 0)
                .unwrap_err(),
            CrosslockError::UnexpectedBatchSize { .. }
        ));

        assert_eq!(
            f.dst
                .send_batch_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &[a, a], &b, 0)
                .unwrap_err(),
            CrosslockError::IncorrectOrderStatus
        );

        let stranger = CallContext::new(Address::evm_filled(0x01)).with_value(BUS_FEE);
        assert_eq!(
            f.dst
                .send_evm_unlock(&mut f.assets, &mut f.gate, &stranger, &a, &b, 0)
                .unwrap_err(),
            CrosslockError::Unauthorized
        );

        let other_chain = fulfilled(&mut f, &order(1, ChainId::SOLANA, Address::solana_filled(0x11), 1_000));
        assert_eq!(
            f.dst
                .send_batch_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &[a, other_chain], &b, 0)
                .unwrap_err(),
            CrosslockError::WrongChain
        );
        // an account-model give chain cannot take an EVM unlock
        assert_eq!(
            f.dst
                .send_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &other_chain, &b, 0)
                .unwrap_err(),
            CrosslockError::WrongChain
        );

        assert!(matches!(
            f.dst
                .send_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &a, &Address::solana_filled(1), 0)
                .unwrap_err(),
            CrosslockError::WrongAddressLength { .. }
        ));

        assert_eq!(
            f.dst
                .send_evm_unlock(&mut f.assets, &mut f.gate, &ctx, &a, &b, 1)
                .unwrap_err(),
            CrosslockError::TransferAmountNotCoverFees
        );

        assert!(f.gate.outbox().is_empty());
        assert_eq!(f.dst.take_order_status(&a), TakeOrderStatus::Fulfilled);
    }

    #[test]
    fn solana_batch_needs_single_token() {
        let mut f = fixture();
        let o1 = order(0, ChainId::SOLANA, Address::solana_filled(0x11), 100_000);
        let o2 = order(1, ChainId::SOLANA, Address::solana_filled(0x12), 100_000);
        let id1 = fulfilled(&mut f, &o1);
        let id2 = fulfilled(&mut f, &o2);
        let b = Address::solana_filled(0xbe);
        let ctx = paid(&f, BUS_FEE);

        assert_eq!(
            f.dst
                .send_batch_solana_unlock(&mut f.assets, &mut f.gate, &ctx, &[o1, o2], &b, 0, 10, 10)
                .unwrap_err(),
            CrosslockError::WrongToken
        );
        assert_eq!(f.dst.take_order_status(&id1), TakeOrderStatus::Fulfilled);
        assert_eq!(f.dst.take_order_status(&id2), TakeOrderStatus::Fulfilled);

        assert_eq!(
            f.dst
                .send_batch_solana_unlock(&mut f.assets, &mut f.gate, &ctx, &[], &b, 0, 10, 10)
                .unwrap_err(),
            CrosslockError::UnexpectedBatchSize { size: 0, max: 7 }
        );
    }

    #[test]
    fn solana_batch_layout_and_rewards() {
        let mut f = fixture();
        let token = Address::solana_filled(0x11);
        let orders: Vec<Order> = (0..2)
            .map(|n| order(n, ChainId::SOLANA, token.clone(), 10_000 + u128::from(n)))
            .collect();
        let ids: Vec<OrderId> = orders.iter().map(|o| fulfilled(&mut f, o)).collect();
        let b = Address::solana_filled(0xbe);
        let ctx = paid(&f, BUS_FEE);

        // smallest order: 10_000 - 500 = 9_500, - 9 bps fee = 9_491
        assert_eq!(
            f.dst
                .send_batch_solana_unlock(&mut f.assets, &mut f.gate, &ctx, &orders, &b, 0, 9_000, 492)
                .unwrap_err(),
            CrosslockError::TransferAmountNotCoverFees
        );

        let sub = f
            .dst
            .send_batch_solana_unlock(&mut f.assets, &mut f.gate, &ctx, &orders, &b, 0, 9_000, 491)
            .unwrap();
        let data = &f.gate.submission(&sub).unwrap().message.data;
        let instructions = crosslock_orderlib::instruction::decode_solana_batch(data).unwrap();
        assert_eq!(instructions.len(), 3);
        assert_eq!(
            instructions[1],
            encode_solana_claim_unlock(TAKE_CHAIN, &Address::solana_filled(0x50), &b, &token, &ids[0], 491)
        );
        assert_eq!(f.dst.take_order_status(&ids[1]), TakeOrderStatus::SentUnlock);
    }

    #[test]
    fn cancel_by_order_authority_only() {
        let mut f = fixture();
        let o = order(0, EVM_GIVE, Address::evm_filled(0x11), 1_000);
        let id = derive_order_id(&o);
        let b = Address::evm_filled(0xbe);
        let native = f.assets.native_asset().clone();
        f.assets.mint(&o.order_authority_address_dst, &native, 10_000);

        let taker_ctx = paid(&f, BUS_FEE);
        assert_eq!(
            f.dst
                .send_evm_order_cancel(&mut f.assets, &mut f.gate, &taker_ctx, &o, &b, 0)
                .unwrap_err(),
            CrosslockError::Unauthorized
        );

        let ctx = CallContext::new(o.order_authority_address_dst.clone()).with_value(BUS_FEE);
        let sub = f
            .dst
            .send_evm_order_cancel(&mut f.assets, &mut f.gate, &ctx, &o, &b, 0)
            .unwrap();
        assert_eq!(f.dst.take_order_status(&id), TakeOrderStatus::SentCancel);
        assert_eq!(
            SourceInstruction::decode(&f.gate.submission(&sub).unwrap().message.data).unwrap(),
            SourceInstruction::ClaimCancel {
                order_id: id,
                beneficiary: b.clone(),
            }
        );

        assert_eq!(
            f.dst
                .send_evm_order_cancel(&mut f.assets, &mut f.gate, &ctx, &o, &b, 0)
                .unwrap_err(),
            CrosslockError::IncorrectOrderStatus
        );
    }

    #[test]
    fn fulfilled_order_cannot_be_cancelled() {
        let mut f = fixture();
        let o = order(0, EVM_GIVE, Address::evm_filled(0x11), 1_000);
        fulfilled(&mut f, &o);
        let native = f.assets.native_asset().clone();
        f.assets.mint(&o.order_authority_address_dst, &native, 10_000);
        let ctx = CallContext::new(o.order_authority_address_dst.clone()).with_value(BUS_FEE);
        assert_eq!(
            f.dst
                .send_evm_order_cancel(&mut f.assets, &mut f.gate, &ctx, &o, &Address::evm_filled(0xbe), 0)
                .unwrap_err(),
            CrosslockError::IncorrectOrderStatus
        );
    }

    #[test]
    fn batch_cancel_and_restricted_beneficiary() {
        let mut f = fixture();
        let token = Address::evm_filled(0x11);
        let mut restricted = order(7, EVM_GIVE, token.clone(), 1_000);
        restricted.allowed_cancel_beneficiary_src = Some(Address::evm_filled(0xcb));
        let plain: Vec<Order> = (0..2).map(|n| order(n, EVM_GIVE, token.clone(), 1_000)).collect();

        let authority = plain[0].order_authority_address_dst.clone();
        let native = f.assets.native_asset().clone();
        f.assets.mint(&authority, &native, 10_000);
        let ctx = CallContext::new(authority).with_value(BUS_FEE);
        let b = Address::evm_filled(0xbe);

        let mixed = vec![plain[0].clone(), restricted.clone()];
        assert!(matches!(
            f.dst
                .send_batch_evm_order_cancel(&mut f.assets, &mut f.gate, &ctx, &mixed, &b, 0)
                .unwrap_err(),
            CrosslockError::WrongArgument { .. }
        ));

        f.dst
            .send_batch_evm_order_cancel(&mut f.assets, &mut f.gate, &ctx, &plain, &b, 0)
            .unwrap();
        assert_eq!(f.dst.events().count("SentOrderCancel"), 2);

        // single cancel is redirected to the restricted beneficiary
        let sub = f
            .dst
            .send_evm_order_cancel(&mut f.assets, &mut f.gate, &ctx, &restricted, &b, 0)
            .unwrap();
        match SourceInstruction::decode(&f.gate.submission(&sub).unwrap().message.data).unwrap() {
            SourceInstruction::ClaimCancel { beneficiary, .. } => {
                assert_eq!(beneficiary, Address::evm_filled(0xcb));
            }
            other => panic!("unexpected instruction {other:?}"),
        }
    }
}
