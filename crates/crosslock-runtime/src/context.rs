//! Identity and value attached to a ledger call.

use chrono::{DateTime, Utc};
use crosslock_types::{Address, Amount, ChainId};

/// Where a forwarded call came from, as vouched for by the message bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusOrigin {
    pub chain_id_from: ChainId,
    /// The contract on the origin chain that sent the message.
    pub native_sender: Address,
}

/// Caller identity, attached native value, and bus origin for one entry
/// point invocation.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub caller: Address,
    /// Native value sent along with the call.
    pub value: Amount,
    /// Set only on calls delivered by the bus call proxy.
    pub origin: Option<BusOrigin>,
    /// Wall clock used for permit deadlines.
    pub now: DateTime<Utc>,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: 0,
            origin: None,
            now: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// A call made by the bus call proxy on behalf of `origin`.
    #[must_use]
    pub fn forwarded(call_proxy: Address, origin: BusOrigin) -> Self {
        Self {
            origin: Some(origin),
            ..Self::new(call_proxy)
        }
    }
}
