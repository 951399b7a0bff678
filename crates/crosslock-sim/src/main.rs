//! Loopback simulation of one settlement corridor.
//!
//! Two in-memory chains share a loopback message bus. One order is
//! escrowed, filled and unlocked; a second is cancelled and refunded.
//!
//! Logging follows `RUST_LOG` (default `info`). Set `CROSSLOCK_LOG_JSON=1`
//! for JSON lines.

use std::error::Error;

use crosslock_destination::DlnDestination;
use crosslock_orderlib::derive_order_id;
use crosslock_runtime::{AssetBook, CallContext, LoopbackGate};
use crosslock_source::DlnSource;
use crosslock_types::{
    Address, Amount, BatchLimits, BusFeeConfig, ChainEngine, ChainId, CrosslockError, DlnEvent,
    FeeConfig, Order, OrderCreation, Result, SubmissionId,
};
use ed25519_dalek::SigningKey;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const GIVE_CHAIN: ChainId = ChainId(1);
const TAKE_CHAIN: ChainId = ChainId(56);
const UNIT: Amount = 1_000_000_000_000_000_000;

/// Everything the simulation is parameterized by.
#[derive(Debug, Serialize)]
struct SimConfig {
    give_chain_id: ChainId,
    take_chain_id: ChainId,
    fees: FeeConfig,
    bus_fees: BusFeeConfig,
    batch_limits: BatchLimits,
    oracles: usize,
    min_confirmations: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            give_chain_id: GIVE_CHAIN,
            take_chain_id: TAKE_CHAIN,
            fees: FeeConfig::default(),
            bus_fees: BusFeeConfig::default(),
            batch_limits: BatchLimits::default(),
            oracles: 3,
            min_confirmations: 2,
        }
    }
}

fn addr(byte: u8) -> Address {
    Address::evm([byte; 20])
}

struct Corridor {
    config: SimConfig,
    src: DlnSource,
    dst: DlnDestination,
    give_book: AssetBook,
    take_book: AssetBook,
    gate: LoopbackGate,
}

impl Corridor {
    fn new(config: SimConfig) -> Result<Self> {
        let oracles = (1..=config.oracles)
            .map(|i| SigningKey::from_bytes(&[u8::try_from(i).unwrap_or(u8::MAX); 32]))
            .collect();
        let gate = LoopbackGate::new(
            config.bus_fees,
            addr(0x7e),
            addr(0xcc),
            oracles,
            config.min_confirmations,
        )?;

        let admin = CallContext::new(addr(0xad));
        let mut src = DlnSource::new(
            config.give_chain_id,
            addr(0x5c),
            addr(0xad),
            gate.call_proxy().clone(),
            config.fees,
        );
        src.set_dln_destination_address(&admin, config.take_chain_id, addr(0xd5), ChainEngine::Evm)?;

        let mut dst = DlnDestination::new(config.take_chain_id, addr(0xd5), addr(0xad));
        dst.set_dln_source_address(&admin, config.give_chain_id, addr(0x5c), ChainEngine::Evm)?;
        dst.set_max_order_counts_per_batch(
            &admin,
            config.batch_limits.max_evm_unlock,
            config.batch_limits.max_solana_unlock,
        )?;

        let mut give_book = AssetBook::new();
        let native = give_book.native_asset().clone();
        give_book.mint(&addr(0xa1), &addr(0x11), 100 * UNIT);
        give_book.mint(&addr(0xa1), &native, UNIT);
        give_book.approve(&addr(0xa1), src.address(), &addr(0x11), Amount::MAX);

        let mut take_book = AssetBook::new();
        take_book.mint(&addr(0x7a), &addr(0x22), 100 * UNIT);
        take_book.mint(&addr(0x7a), &native, UNIT);
        take_book.mint(&addr(0xa2), &native, UNIT);
        take_book.approve(&addr(0x7a), dst.address(), &addr(0x22), Amount::MAX);

        Ok(Self {
            config,
            src,
            dst,
            give_book,
            take_book,
            gate,
        })
    }

    fn create(&mut self, give_amount: Amount) -> Result<Order> {
        let creation = OrderCreation {
            give_token_address: addr(0x11),
            give_amount,
            take_token_address: addr(0x22),
            take_amount: give_amount / 2,
            take_chain_id: self.config.take_chain_id,
            receiver_dst: addr(0xd1),
            give_patch_authority_src: addr(0xa1),
            order_authority_address_dst: addr(0xa2),
            allowed_taker_dst: None,
            external_call: None,
            allowed_cancel_beneficiary_src: None,
        };
        let ctx = CallContext::new(addr(0xa1)).with_value(self.config.fees.fixed_native_fee);
        self.src
            .create_order(&mut self.give_book, &ctx, &creation, &[], 0, &[])?;
        match self.src.events().iter().last() {
            Some(DlnEvent::CreatedOrder { order, .. }) => Ok(order.clone()),
            _ => Err(CrosslockError::Internal("order creation not announced".into())),
        }
    }

    fn relay(&mut self, id: &SubmissionId) -> Result<()> {
        let signatures = self.gate.sign(id);
        let (src, book) = (&mut self.src, &mut self.give_book);
        self.gate
            .claim(id, &signatures, |ctx, data| src.execute_forwarded(book, ctx, data))
    }

    fn run(&mut self) -> Result<()> {
        let bus_fee = self.config.bus_fees.fixed_native_fee;

        // Fill and unlock.
        let order = self.create(10 * UNIT)?;
        let order_id = derive_order_id(&order);
        let taker = CallContext::new(addr(0x7a));
        self.dst.fulfill_order(
            &mut self.take_book,
            &taker,
            &order,
            order.take_amount,
            &order_id,
            &[],
            &addr(0x7a),
            &Address::zero(),
        )?;
        let beneficiary = addr(0xbe);
        let sub = self.dst.send_evm_unlock(
            &mut self.take_book,
            &mut self.gate,
            &taker.with_value(bus_fee),
            &order_id,
            &beneficiary,
            0,
        )?;
        self.relay(&sub)?;
        info!(
            order_id = %order_id.short(),
            status = %self.src.give_order_status(&order_id),
            paid = self.give_book.balance(&beneficiary, &addr(0x11)),
            "Unlock settled"
        );

        // Cancel and refund.
        let order = self.create(UNIT)?;
        let order_id = derive_order_id(&order);
        let authority = CallContext::new(addr(0xa2)).with_value(bus_fee);
        let sub = self.dst.send_evm_order_cancel(
            &mut self.take_book,
            &mut self.gate,
            &authority,
            &order,
            &addr(0xa1),
            0,
        )?;
        self.relay(&sub)?;
        info!(
            order_id = %order_id.short(),
            status = %self.src.give_order_status(&order_id),
            "Cancel settled"
        );

        self.give_book.verify_supply()?;
        self.take_book.verify_supply()?;
        info!(
            give_side_events = self.src.events().len(),
            take_side_events = self.dst.events().len(),
            messages = self.gate.outbox().len(),
            "Simulation complete"
        );
        Ok(())
    }
}

fn setup_tracing() -> std::result::Result<(), Box<dyn Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if std::env::var_os("CROSSLOCK_LOG_JSON").is_some() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    setup_tracing()?;

    let config = SimConfig::default();
    println!("{}", serde_json::to_string_pretty(&config)?);

    let mut corridor = Corridor::new(config)?;
    corridor.run()?;
    Ok(())
}
