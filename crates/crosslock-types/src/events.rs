//! Records the ledgers emit for off-chain indexers and relayers.
//!
//! Every ledger and the adapter own an [`EventLog`]; each emitted
//! [`DlnEvent`] is stamped with a per-log sequence number and the wall
//! clock time it was recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Address, Amount, CallId, ChainEngine, ChainId, GiveOrderStatus, Order, OrderId, SubmissionId,
};

/// Everything a ledger can announce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DlnEvent {
    // --- give side ---
    CreatedOrder {
        order: Order,
        order_id: OrderId,
        affiliate_fee: Vec<u8>,
        native_fix_fee: Amount,
        percent_fee: Amount,
        referral_code: u32,
        payload: Vec<u8>,
    },
    IncreasedGiveAmount {
        order_id: OrderId,
        order_give_final_amount: Amount,
        final_percent_fee: Amount,
    },
    ClaimedUnlock {
        order_id: OrderId,
        beneficiary: Address,
        give_amount: Amount,
        give_token_address: Address,
    },
    ClaimedOrderCancel {
        order_id: OrderId,
        beneficiary: Address,
        paid_amount: Amount,
        give_token_address: Address,
    },
    UnexpectedOrderStatusForClaim {
        order_id: OrderId,
        status: GiveOrderStatus,
        beneficiary: Address,
    },
    UnexpectedOrderStatusForCancel {
        order_id: OrderId,
        status: GiveOrderStatus,
        beneficiary: Address,
    },
    CriticalMismatchChainId {
        order_id: OrderId,
        beneficiary: Address,
        take_chain_id: ChainId,
        submission_chain_id_from: ChainId,
    },
    GlobalFeeUpdated {
        fixed_native_fee: Amount,
        transfer_fee_bps: u64,
    },
    FeeWithdrawn {
        token: Address,
        recipient: Address,
        amount: Amount,
    },
    DlnDestinationAddressUpdated {
        chain_id_to: ChainId,
        address: Address,
        engine: ChainEngine,
    },

    // --- take side ---
    FulfilledOrder {
        order: Order,
        order_id: OrderId,
        sender: Address,
        unlock_authority: Address,
    },
    DecreasedTakeAmount {
        order_id: OrderId,
        order_take_final_amount: Amount,
    },
    SentOrderUnlock {
        order_id: OrderId,
        beneficiary: Address,
        submission_id: SubmissionId,
    },
    SentOrderCancel {
        order_id: OrderId,
        cancel_beneficiary: Address,
        submission_id: SubmissionId,
    },
    DlnSourceAddressUpdated {
        chain_id_from: ChainId,
        address: Address,
        engine: ChainEngine,
    },
    MaxOrderCountsPerBatchUpdated {
        max_evm_unlock: usize,
        max_solana_unlock: usize,
    },
    ExternalCallAdapterUpdated {
        old: Address,
        new: Address,
    },

    // --- adapter ---
    ExternalCallRegistered {
        call_id: CallId,
        order_id: OrderId,
        call_authority: Address,
        token: Address,
        amount: Amount,
        external_call: Vec<u8>,
    },
    ExternalCallExecuted {
        order_id: OrderId,
        call_succeeded: bool,
    },
    ExternalCallCancelled {
        call_id: CallId,
        order_id: OrderId,
        cancel_beneficiary: Address,
        token: Address,
        amount: Amount,
    },
    ExecutorUpdated {
        old: Address,
        new: Address,
    },
}

impl DlnEvent {
    /// Event name as indexers know it.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreatedOrder { .. } => "CreatedOrder",
            Self::IncreasedGiveAmount { .. } => "IncreasedGiveAmount",
            Self::ClaimedUnlock { .. } => "ClaimedUnlock",
            Self::ClaimedOrderCancel { .. } => "ClaimedOrderCancel",
            Self::UnexpectedOrderStatusForClaim { .. } => "UnexpectedOrderStatusForClaim",
            Self::UnexpectedOrderStatusForCancel { .. } => "UnexpectedOrderStatusForCancel",
            Self::CriticalMismatchChainId { .. } => "CriticalMismatchChainId",
            Self::GlobalFeeUpdated { .. } => "GlobalFeeUpdated",
            Self::FeeWithdrawn { .. } => "FeeWithdrawn",
            Self::DlnDestinationAddressUpdated { .. } => "DlnDestinationAddressUpdated",
            Self::FulfilledOrder { .. } => "FulfilledOrder",
            Self::DecreasedTakeAmount { .. } => "DecreasedTakeAmount",
            Self::SentOrderUnlock { .. } => "SentOrderUnlock",
            Self::SentOrderCancel { .. } => "SentOrderCancel",
            Self::DlnSourceAddressUpdated { .. } => "DlnSourceAddressUpdated",
            Self::MaxOrderCountsPerBatchUpdated { .. } => "MaxOrderCountsPerBatchUpdated",
            Self::ExternalCallAdapterUpdated { .. } => "ExternalCallAdapterUpdated",
            Self::ExternalCallRegistered { .. } => "ExternalCallRegistered",
            Self::ExternalCallExecuted { .. } => "ExternalCallExecuted",
            Self::ExternalCallCancelled { .. } => "ExternalCallCancelled",
            Self::ExecutorUpdated { .. } => "ExecutorUpdated",
        }
    }
}

/// A stamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub emitted_at: DateTime<Utc>,
    pub event: DlnEvent,
}

/// Append-only event log owned by one ledger.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: DlnEvent) {
        self.records.push(EventRecord {
            seq: self.next_seq,
            emitted_at: Utc::now(),
            event,
        });
        self.next_seq += 1;
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &DlnEvent> {
        self.records.iter().map(|r| &r.event)
    }

    /// Take every record emitted so far. Sequence numbers keep counting.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    /// Number of retained events with the given name.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.iter().filter(|e| e.name() == name).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
