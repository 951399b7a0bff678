//! Message bus seen from a ledger: a fee schedule, a treasury that
//! collects the native fee, and a `send` that returns a submission id.

use crosslock_types::{Address, Amount, BusFeeConfig, ChainId, Result, SubmissionId};

/// An outbound cross-chain message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chain_id_from: ChainId,
    pub chain_id_to: ChainId,
    /// Ledger that sent the message.
    pub sender: Address,
    /// Ledger on the target chain that will receive it.
    pub receiver: Address,
    pub data: Vec<u8>,
    /// Paid to whoever claims the message on the target chain.
    pub execution_fee: Amount,
}

/// Outbound half of the message bus.
pub trait MessageBus {
    /// Current fee schedule.
    fn fees(&self) -> BusFeeConfig;

    /// Account that receives the native value attached to a send.
    fn treasury(&self) -> Address;

    /// Queue a message for delivery.
    fn send(&mut self, message: OutboundMessage) -> Result<SubmissionId>;
}
