//! `DlnDestination` state, queries and admin surface.

use std::collections::HashMap;

use crosslock_adapter::ExternalCallAdapter;
use crosslock_orderlib::validate_address;
use crosslock_runtime::CallContext;
use crosslock_types::{
    Address, Amount, BatchLimits, ChainEngine, ChainId, CrosslockError, DlnEvent, EventLog,
    EventRecord, OrderId, PeerConfig, Result, TakeOrderState, TakeOrderStatus,
};

/// Take-side ledger for one chain.
#[derive(Debug)]
pub struct DlnDestination {
    pub(crate) chain_id: ChainId,
    pub(crate) address: Address,
    pub(crate) admin: Address,
    /// Give-side ledger registered per give chain.
    pub(crate) dln_sources: HashMap<ChainId, PeerConfig>,
    pub(crate) take_orders: HashMap<OrderId, TakeOrderState>,
    /// Current discount on the take amount, per order.
    pub(crate) take_patches: HashMap<OrderId, Amount>,
    pub(crate) limits: BatchLimits,
    pub(crate) adapter: Option<ExternalCallAdapter>,
    pub(crate) events: EventLog,
}

impl DlnDestination {
    #[must_use]
    pub fn new(chain_id: ChainId, address: Address, admin: Address) -> Self {
        Self {
            chain_id,
            address,
            admin,
            dln_sources: HashMap::new(),
            take_orders: HashMap::new(),
            take_patches: HashMap::new(),
            limits: BatchLimits::default(),
            adapter: None,
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
    pub fn take_order(&self, order_id: &OrderId) -> Option<&TakeOrderState> {
        self.take_orders.get(order_id)
    }

    #[must_use]
    pub fn take_order_status(&self, order_id: &OrderId) -> TakeOrderStatus {
        self.take_orders
            .get(order_id)
            .map_or(TakeOrderStatus::NotSet, |s| s.status)
    }

    #[must_use]
    pub fn take_patch(&self, order_id: &OrderId) -> Amount {
        self.take_patches.get(order_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn dln_source_address(&self, chain_id: ChainId) -> Option<&PeerConfig> {
        self.dln_sources.get(&chain_id)
    }

    #[must_use]
    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    #[must_use]
    pub fn adapter(&self) -> Option<&ExternalCallAdapter> {
        self.adapter.as_ref()
    }

    /// Mutable access for `execute_call` / `cancel_call` on registered
    /// external calls.
    pub fn adapter_mut(&mut self) -> Option<&mut ExternalCallAdapter> {
        self.adapter.as_mut()
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

    /// Register the give-side ledger on `chain_id_from`.
    pub fn set_dln_source_address(
        &mut self,
        ctx: &CallContext,
        chain_id_from: ChainId,
        address: Address,
        engine: ChainEngine,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        validate_address("dln_source", &address, engine)?;
        self.dln_sources.insert(
            chain_id_from,
            PeerConfig {
                address: address.clone(),
                engine,
            },
        );
        tracing::info!(chain = %chain_id_from, peer = %address, %engine, "Give-side ledger registered");
        self.events.emit(DlnEvent::DlnSourceAddressUpdated {
            chain_id_from,
            address,
            engine,
        });
        Ok(())
    }

    pub fn set_max_order_counts_per_batch(
        &mut self,
        ctx: &CallContext,
        max_evm_unlock: usize,
        max_solana_unlock: usize,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        self.limits = BatchLimits {
            max_evm_unlock,
            max_solana_unlock,
        };
        self.events.emit(DlnEvent::MaxOrderCountsPerBatchUpdated {
            max_evm_unlock,
            max_solana_unlock,
        });
        Ok(())
    }

    /// Install the adapter that receives funds of orders carrying an
    /// external call. It must accept deliveries from this ledger.
    pub fn set_external_call_adapter(
        &mut self,
        ctx: &CallContext,
        adapter: ExternalCallAdapter,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        if *adapter.dln_destination() != self.address {
            return Err(CrosslockError::wrong_argument(
                "adapter does not accept calls from this ledger",
            ));
        }
        let old = self
            .adapter
            .as_ref()
            .map_or_else(Address::zero, |a| a.address().clone());
        let new = adapter.address().clone();
        self.adapter = Some(adapter);
        self.events
            .emit(DlnEvent::ExternalCallAdapterUpdated { old, new });
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
