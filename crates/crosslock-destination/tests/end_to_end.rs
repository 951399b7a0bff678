//! End-to-end settlement across both ledgers and the loopback bus.
//!
//! Give chain 1 escrows, take chain 56 fills, and the bus carries unlock
//! and cancel instructions back. Each `AssetBook` stands for one chain.
//!
//! The scenarios cover fee netting, batch aggregation, replay protection,
//! oracle confirmation, anomaly recording, taker restrictions, external
//! call routing, cancel refunds and supply conservation.

use crosslock_adapter::{ExternalCallAdapter, ExternalCallExecutor, RecordingTarget};
use crosslock_destination::DlnDestination;
use crosslock_orderlib::{ExternalCallEnvelope, derive_order_id};
use crosslock_runtime::{AssetBook, CallContext, LoopbackGate};
use crosslock_source::DlnSource;
use crosslock_types::*;
use ed25519_dalek::SigningKey;
use rand::seq::SliceRandom;

const GIVE_CHAIN: ChainId = ChainId(1);
const TAKE_CHAIN: ChainId = ChainId(56);
const FIXED_FEE: Amount = 1_000;
const BUS_FEE: Amount = 500;
const UNIT: Amount = 1_000_000_000_000_000_000;

fn admin() -> Address {
    Address::evm_filled(0xad)
}

/// Helper: both ledgers, one asset book per chain, and the bus between.
struct Corridor {
    src: DlnSource,
    dst: DlnDestination,
    give_book: AssetBook,
    take_book: AssetBook,
    gate: LoopbackGate,
    maker: Address,
    taker: Address,
    give_token: Address,
    take_token: Address,
}

impl Corridor {
    fn new() -> Self {
        let gate = LoopbackGate::new(
            BusFeeConfig {
                fixed_native_fee: BUS_FEE,
                transfer_fee_bps: 0,
            },
            Address::evm_filled(0x7e),
            Address::evm_filled(0xcc),
            vec![
                SigningKey::from_bytes(&[1; 32]),
                SigningKey::from_bytes(&[2; 32]),
            ],
            2,
        )
        .expect("bus fees in range");

        let admin_ctx = CallContext::new(admin());
        let mut src = DlnSource::new(
            GIVE_CHAIN,
            Address::evm_filled(0x5c),
            admin(),
            gate.call_proxy().clone(),
            FeeConfig {
                fixed_native_fee: FIXED_FEE,
                transfer_fee_bps: 10,
            },
        );
        src.set_dln_destination_address(&admin_ctx, TAKE_CHAIN, Address::evm_filled(0xd5), ChainEngine::Evm)
            .expect("register take side");

        let mut dst = DlnDestination::new(TAKE_CHAIN, Address::evm_filled(0xd5), admin());
        dst.set_dln_source_address(&admin_ctx, GIVE_CHAIN, Address::evm_filled(0x5c), ChainEngine::Evm)
            .expect("register give side");
        dst.set_dln_source_address(
            &admin_ctx,
            ChainId::SOLANA,
            Address::solana_filled(0x50),
            ChainEngine::Solana,
        )
        .expect("register account-model give side");

        let maker = Address::evm_filled(0xa1);
        let taker = Address::evm_filled(0x7a);
        let give_token = Address::evm_filled(0x11);
        let take_token = Address::evm_filled(0x22);

        let mut give_book = AssetBook::new();
        let native = give_book.native_asset().clone();
        give_book.mint(&maker, &give_token, 1_000 * UNIT);
        give_book.mint(&maker, &native, 1_000_000);
        give_book.approve(&maker, src.address(), &give_token, Amount::MAX);

        let mut take_book = AssetBook::new();
        take_book.mint(&taker, &take_token, 1_000 * UNIT);
        take_book.mint(&taker, &native, 1_000_000);
        take_book.approve(&taker, dst.address(), &take_token, Amount::MAX);

        Self {
            src,
            dst,
            give_book,
            take_book,
            gate,
            maker,
            taker,
            give_token,
            take_token,
        }
    }

    fn creation(&self, give_amount: Amount) -> OrderCreation {
        OrderCreation::dummy(
            self.give_token.clone(),
            give_amount,
            TAKE_CHAIN,
            self.take_token.clone(),
            give_amount / 2,
        )
    }

    /// Create on the give side and return the order as announced.
    fn create(&mut self, creation: &OrderCreation) -> Order {
        let ctx = CallContext::new(self.maker.clone()).with_value(FIXED_FEE);
        self.src
            .create_order(&mut self.give_book, &ctx, creation, &[], 0, &[])
            .expect("create should succeed");
        match self.src.events().iter().last() {
            Some(DlnEvent::CreatedOrder { order, .. }) => order.clone(),
            other => panic!("expected CreatedOrder, got {other:?}"),
        }
    }

    fn fulfill(&mut self, order: &Order) -> Result<()> {
        let taker = self.taker.clone();
        self.fulfill_as(&taker, order)
    }

    fn fulfill_as(&mut self, taker: &Address, order: &Order) -> Result<()> {
        let ctx = CallContext::new(taker.clone());
        let order_id = derive_order_id(order);
        self.dst.fulfill_order(
            &mut self.take_book,
            &ctx,
            order,
            order.take_amount,
            &order_id,
            &[],
            taker,
            &Address::zero(),
        )
    }

    fn send_unlock(&mut self, order_ids: &[OrderId], beneficiary: &Address) -> SubmissionId {
        let ctx = CallContext::new(self.taker.clone()).with_value(BUS_FEE);
        self.dst
            .send_batch_evm_unlock(&mut self.take_book, &mut self.gate, &ctx, order_ids, beneficiary, 0)
            .expect("unlock should send")
    }

    fn relay(&mut self, id: &SubmissionId) -> Result<()> {
        let signatures = self.gate.sign(id);
        self.relay_with(id, &signatures)
    }

    fn relay_with(&mut self, id: &SubmissionId, signatures: &[Vec<u8>]) -> Result<()> {
        let (src, book) = (&mut self.src, &mut self.give_book);
        self.gate
            .claim(id, signatures, |ctx, data| src.execute_forwarded(book, ctx, data))
    }

    fn verify_supply(&self) {
        self.give_book.verify_supply().expect("give chain supply conserved");
        self.take_book.verify_supply().expect("take chain supply conserved");
    }
}

// =========================================================================
// Full cycle
// =========================================================================

#[test]
fn ten_units_at_ten_bps_unlock_nine_point_nine_nine() {
    let mut c = Corridor::new();
    let creation = c.creation(10 * UNIT);
    let order = c.create(&creation);
    let order_id = derive_order_id(&order);
    assert_eq!(order.give_amount, 9_990_000_000_000_000_000);

    c.fulfill(&order).unwrap();
    assert_eq!(c.take_book.balance(&order.receiver_dst, &c.take_token), 5 * UNIT);
    assert_eq!(c.dst.take_order_status(&order_id), TakeOrderStatus::Fulfilled);

    let beneficiary = Address::evm_filled(0xbe);
    let ctx = CallContext::new(c.taker.clone()).with_value(BUS_FEE);
    let sub = c
        .dst
        .send_evm_unlock(&mut c.take_book, &mut c.gate, &ctx, &order_id, &beneficiary, 0)
        .unwrap();
    assert_eq!(c.dst.take_order_status(&order_id), TakeOrderStatus::SentUnlock);

    c.relay(&sub).unwrap();
    assert_eq!(
        c.give_book.balance(&beneficiary, &c.give_token),
        9_990_000_000_000_000_000
    );
    assert_eq!(c.src.give_order_status(&order_id), GiveOrderStatus::ClaimedUnlock);
    assert_eq!(c.src.collected_fee(&c.give_token), 10_000_000_000_000_000);
    let native = c.give_book.native_asset().clone();
    assert_eq!(c.src.collected_fee(&native), FIXED_FEE);
    assert_eq!(
        c.take_book.balance(&Address::evm_filled(0x7e), &native),
        BUS_FEE
    );

    c.verify_supply();
}

#[test]
fn replayed_submission_is_rejected() {
    let mut c = Corridor::new();
    let creation = c.creation(10_000);
    let order = c.create(&creation);
    c.fulfill(&order).unwrap();
    let beneficiary = Address::evm_filled(0xbe);
    let sub = c.send_unlock(&[derive_order_id(&order)], &beneficiary);

    c.relay(&sub).unwrap();
    let paid = c.give_book.balance(&beneficiary, &c.give_token);

    let err = c.relay(&sub).unwrap_err();
    assert!(matches!(err, CrosslockError::SubmissionUsed(id) if id == sub));
    assert!(err.to_string().starts_with("CL_ERR_500"));
    assert_eq!(c.give_book.balance(&beneficiary, &c.give_token), paid);
}

#[test]
fn take_patch_lowers_the_fill() {
    let mut c = Corridor::new();
    let creation = c.creation(10_000);
    let order = c.create(&creation);
    let order_id = derive_order_id(&order);

    let authority = CallContext::new(order.order_authority_address_dst.clone());
    c.dst.patch_order_take(&authority, &order, 1_000).unwrap();

    let ctx = CallContext::new(c.taker.clone());
    let err = c
        .dst
        .fulfill_order(&mut c.take_book, &ctx, &order, order.take_amount, &order_id, &[], &c.taker, &Address::zero())
        .unwrap_err();
    assert!(matches!(err, CrosslockError::WrongArgument { .. }));

    c.dst
        .fulfill_order(&mut c.take_book, &ctx, &order, 4_000, &order_id, &[], &c.taker, &Address::zero())
        .unwrap();
    assert_eq!(c.take_book.balance(&order.receiver_dst, &c.take_token), 4_000);
}

// =========================================================================
// Batches
// =========================================================================

/// Create, fill and unlock six orders in one batch. Returns what the
/// beneficiary received and how many transfers the claim made.
fn settle_six(shuffle: bool) -> (Amount, usize) {
    let mut c = Corridor::new();
    let mut order_ids = Vec::new();
    for k in 1..=6u128 {
        let creation = c.creation(k * 1_000_000);
        let order = c.create(&creation);
        c.fulfill(&order).unwrap();
        order_ids.push(derive_order_id(&order));
    }
    if shuffle {
        order_ids.shuffle(&mut rand::thread_rng());
    }

    let beneficiary = Address::evm_filled(0xbe);
    let sub = c.send_unlock(&order_ids, &beneficiary);
    let mark = c.give_book.transfer_count();
    c.relay(&sub).unwrap();

    for order_id in &order_ids {
        assert_eq!(c.src.give_order_status(order_id), GiveOrderStatus::ClaimedUnlock);
    }
    c.verify_supply();
    (
        c.give_book.balance(&beneficiary, &c.give_token),
        c.give_book.transfers_since(mark).len(),
    )
}

#[test]
fn batch_unlock_is_order_independent() {
    let (in_order, transfers) = settle_six(false);
    let (shuffled, shuffled_transfers) = settle_six(true);

    // 21_000_000 raw, less 10 bps
    assert_eq!(in_order, 20_979_000);
    assert_eq!(shuffled, in_order);
    // one (asset, beneficiary) group, one transfer
    assert_eq!(transfers, 1);
    assert_eq!(shuffled_transfers, 1);
}

#[test]
fn unknown_order_in_batch_is_recorded_not_paid() {
    let mut c = Corridor::new();
    let creation = c.creation(10_000);
    let real = c.create(&creation);

    // Never created on the give side.
    let ghost = Order {
        maker_order_nonce: 99,
        maker_src: c.maker.clone(),
        give_chain_id: GIVE_CHAIN,
        give_token_address: c.give_token.clone(),
        give_amount: 5_000,
        take_chain_id: TAKE_CHAIN,
        take_token_address: c.take_token.clone(),
        take_amount: 100,
        receiver_dst: Address::evm_filled(0xd1),
        give_patch_authority_src: c.maker.clone(),
        order_authority_address_dst: Address::evm_filled(0xa2),
        allowed_taker_dst: None,
        allowed_cancel_beneficiary_src: None,
        external_call: None,
    };
    c.fulfill(&real).unwrap();
    c.fulfill(&ghost).unwrap();

    let real_id = derive_order_id(&real);
    let ghost_id = derive_order_id(&ghost);
    let beneficiary = Address::evm_filled(0xbe);
    let sub = c.send_unlock(&[ghost_id, real_id], &beneficiary);
    c.relay(&sub).unwrap();

    assert!(c.gate.is_claimed(&sub));
    assert_eq!(c.src.give_order_status(&real_id), GiveOrderStatus::ClaimedUnlock);
    assert_eq!(c.src.give_order_status(&ghost_id), GiveOrderStatus::NotSet);
    assert_eq!(c.src.unexpected_order_status_for_claim(&ghost_id), Some(&beneficiary));
    assert_eq!(c.src.events().count("UnexpectedOrderStatusForClaim"), 1);
    assert_eq!(c.give_book.balance(&beneficiary, &c.give_token), real.give_amount);
    c.verify_supply();
}

#[test]
fn account_model_batch_rules() {
    let mut c = Corridor::new();
    let solana_order = |nonce: u64, token: u8| Order {
        maker_order_nonce: nonce,
        maker_src: Address::solana_filled(0xa1),
        give_chain_id: ChainId::SOLANA,
        give_token_address: Address::solana_filled(token),
        give_amount: 100_000,
        take_chain_id: TAKE_CHAIN,
        take_token_address: Address::evm_filled(0x22),
        take_amount: 100,
        receiver_dst: Address::evm_filled(0xd1),
        give_patch_authority_src: Address::solana_filled(0xa1),
        order_authority_address_dst: Address::evm_filled(0xa2),
        allowed_taker_dst: None,
        allowed_cancel_beneficiary_src: None,
        external_call: None,
    };
    let same: Vec<Order> = (0..8).map(|n| solana_order(n, 0x11)).collect();
    let odd = solana_order(100, 0x12);
    for order in same.iter().chain(std::iter::once(&odd)) {
        c.fulfill(order).unwrap();
    }

    let beneficiary = Address::solana_filled(0xbe);
    let ctx = CallContext::new(c.taker.clone()).with_value(BUS_FEE);

    let mixed = vec![same[0].clone(), odd.clone()];
    let err = c
        .dst
        .send_batch_solana_unlock(&mut c.take_book, &mut c.gate, &ctx, &mixed, &beneficiary, 0, 1_000, 1_000)
        .unwrap_err();
    assert_eq!(err, CrosslockError::WrongToken);

    let err = c
        .dst
        .send_batch_solana_unlock(&mut c.take_book, &mut c.gate, &ctx, &[], &beneficiary, 0, 1_000, 1_000)
        .unwrap_err();
    assert_eq!(err, CrosslockError::UnexpectedBatchSize { size: 0, max: 7 });

    let err = c
        .dst
        .send_batch_solana_unlock(&mut c.take_book, &mut c.gate, &ctx, &same, &beneficiary, 0, 1_000, 1_000)
        .unwrap_err();
    assert_eq!(err, CrosslockError::UnexpectedBatchSize { size: 8, max: 7 });
    assert!(err.to_string().starts_with("CL_ERR_107"));

    // nothing moved
    assert!(c.gate.outbox().is_empty());
    for order in same.iter().chain(std::iter::once(&odd)) {
        assert_eq!(
            c.dst.take_order_status(&derive_order_id(order)),
            TakeOrderStatus::Fulfilled
        );
    }

    c.dst
        .send_batch_solana_unlock(&mut c.take_book, &mut c.gate, &ctx, &same[..7], &beneficiary, 0, 1_000, 1_000)
        .unwrap();
    assert_eq!(c.gate.outbox().len(), 1);
    assert_eq!(
        c.dst.take_order_status(&derive_order_id(&same[0])),
        TakeOrderStatus::SentUnlock
    );
    assert_eq!(
        c.dst.take_order_status(&derive_order_id(&same[7])),
        TakeOrderStatus::Fulfilled
    );
}

// =========================================================================
// Security
// =========================================================================

#[test]
fn insufficient_oracle_confirmations() {
    let mut c = Corridor::new();
    let creation = c.creation(10_000);
    let order = c.create(&creation);
    let order_id = derive_order_id(&order);
    c.fulfill(&order).unwrap();
    let sub = c.send_unlock(&[order_id], &Address::evm_filled(0xbe));

    let mut signatures = c.gate.sign(&sub);
    signatures[1][0] ^= 0xff;
    assert_eq!(
        c.relay_with(&sub, &signatures).unwrap_err(),
        CrosslockError::NotConfirmed {
            valid: 1,
            required: 2,
        }
    );

    // the same valid signature twice counts once
    let doubled = vec![signatures[0].clone(), signatures[0].clone()];
    assert!(c.relay_with(&sub, &doubled).is_err());

    assert_eq!(c.src.give_order_status(&order_id), GiveOrderStatus::Created);
    assert!(!c.gate.is_claimed(&sub));

    c.relay(&sub).unwrap();
    assert_eq!(c.src.give_order_status(&order_id), GiveOrderStatus::ClaimedUnlock);
}

#[test]
fn allowed_taker_is_enforced() {
    let mut c = Corridor::new();
    let chosen = Address::evm_filled(0x77);
    let mut creation = c.creation(10_000);
    creation.allowed_taker_dst = Some(chosen.clone());
    let order = c.create(&creation);
    let order_id = derive_order_id(&order);

    let err = c.fulfill(&order).unwrap_err();
    assert_eq!(err, CrosslockError::Unauthorized);
    assert!(err.to_string().starts_with("CL_ERR_200"));
    assert_eq!(c.dst.take_order_status(&order_id), TakeOrderStatus::NotSet);
    assert_eq!(c.take_book.balance(&order.receiver_dst, &c.take_token), 0);

    c.take_book.mint(&chosen, &c.take_token, 10_000);
    c.take_book.approve(&chosen, c.dst.address(), &c.take_token, Amount::MAX);
    c.fulfill_as(&chosen, &order).unwrap();
    assert_eq!(c.dst.take_order(&order_id).unwrap().taker_address, chosen);

    // only the unlock authority may send the unlock
    let ctx = CallContext::new(c.taker.clone()).with_value(BUS_FEE);
    assert_eq!(
        c.dst
            .send_evm_unlock(&mut c.take_book, &mut c.gate, &ctx, &order_id, &c.taker, 0)
            .unwrap_err(),
        CrosslockError::Unauthorized
    );
}

// =========================================================================
// External calls
// =========================================================================

fn install_adapter(c: &mut Corridor, target: &Address, recorder: &RecordingTarget) {
    let admin_ctx = CallContext::new(admin());
    let mut adapter = ExternalCallAdapter::new(
        Address::evm_filled(0xa0),
        admin(),
        c.dst.address().clone(),
        ExternalCallExecutor::new(Address::evm_filled(0xee)),
    );
    adapter
        .register_target(&admin_ctx, target.clone(), Box::new(recorder.clone()))
        .unwrap();
    c.dst.set_external_call_adapter(&admin_ctx, adapter).unwrap();
}

fn fulfill_with_call(c: &mut Corridor, call_data: Vec<u8>, target: &Address, fallback: &Address) -> Order {
    let envelope = ExternalCallEnvelope::simple(target.clone(), fallback.clone(), 0, call_data);
    let mut creation = c.creation(10_000);
    creation.external_call = Some(envelope.encode());
    let order = c.create(&creation);
    let order_id = derive_order_id(&order);

    let ctx = CallContext::new(c.taker.clone());
    c.dst
        .fulfill_order(&mut c.take_book, &ctx, &order, order.take_amount, &order_id, &[], &c.taker, &c.taker)
        .unwrap();
    order
}

#[test]
fn blocked_selector_routes_to_fallback() {
    let mut c = Corridor::new();
    let target = Address::evm_filled(0x70);
    let fallback = Address::evm_filled(0xfb);
    let recorder = RecordingTarget::new();
    install_adapter(&mut c, &target, &recorder);

    let mut call_data = constants::SELECTOR_TRANSFER.to_vec();
    call_data.extend_from_slice(&[0; 64]);
    let order = fulfill_with_call(&mut c, call_data, &target, &fallback);

    assert_eq!(c.take_book.balance(&fallback, &c.take_token), order.take_amount);
    assert_eq!(c.take_book.balance(&target, &c.take_token), 0);
    assert_eq!(c.take_book.balance(&order.receiver_dst, &c.take_token), 0);
    assert!(recorder.calls().is_empty());

    let adapter = c.dst.adapter().unwrap();
    assert!(adapter.events().iter().any(|e| matches!(
        e,
        DlnEvent::ExternalCallExecuted {
            call_succeeded: false,
            ..
        }
    )));
    // the fill itself stands
    assert_eq!(
        c.dst.take_order_status(&derive_order_id(&order)),
        TakeOrderStatus::Fulfilled
    );
    c.verify_supply();
}

#[test]
fn allowed_call_delivers_to_target() {
    let mut c = Corridor::new();
    let target = Address::evm_filled(0x70);
    let fallback = Address::evm_filled(0xfb);
    let recorder = RecordingTarget::new();
    install_adapter(&mut c, &target, &recorder);

    let order = fulfill_with_call(&mut c, vec![0x12, 0x34, 0x56, 0x78, 0x00], &target, &fallback);

    assert_eq!(c.take_book.balance(&target, &c.take_token), order.take_amount);
    assert_eq!(c.take_book.balance(&fallback, &c.take_token), 0);
    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].order_id, derive_order_id(&order));
    assert_eq!(calls[0].amount, order.take_amount);
}

// =========================================================================
// Cancel
// =========================================================================

#[test]
fn cancel_refunds_maker_and_fees_can_be_withdrawn() {
    let mut c = Corridor::new();
    let creation = c.creation(10_000);
    let order = c.create(&creation);
    let order_id = derive_order_id(&order);
    let native = c.take_book.native_asset().clone();

    let authority = order.order_authority_address_dst.clone();
    c.take_book.mint(&authority, &native, BUS_FEE);
    let ctx = CallContext::new(authority).with_value(BUS_FEE);
    let sub = c
        .dst
        .send_evm_order_cancel(&mut c.take_book, &mut c.gate, &ctx, &order, &c.maker, 0)
        .unwrap();
    assert_eq!(c.dst.take_order_status(&order_id), TakeOrderStatus::SentCancel);

    let before = c.give_book.balance(&c.maker, &c.give_token);
    c.relay(&sub).unwrap();
    // raw amount back: net give, percent fee and no affiliate
    assert_eq!(c.give_book.balance(&c.maker, &c.give_token) - before, 10_000);
    assert_eq!(c.src.give_order_status(&order_id), GiveOrderStatus::ClaimedCancel);
    assert_eq!(c.src.collected_fee(&c.give_token), 0);
    assert_eq!(c.src.collected_fee(&native), FIXED_FEE);

    // a late fill is refused
    assert_eq!(c.fulfill(&order).unwrap_err(), CrosslockError::IncorrectOrderStatus);

    let fee_sink = Address::evm_filled(0xfe);
    c.src
        .withdraw_fee(&mut c.give_book, &CallContext::new(admin()), &[native.clone()], &fee_sink)
        .unwrap();
    assert_eq!(c.give_book.balance(&fee_sink, &native), FIXED_FEE);
    assert_eq!(c.give_book.balance(c.src.address(), &native), 0);
    assert_eq!(c.give_book.balance(c.src.address(), &c.give_token), 0);
    c.verify_supply();
}
