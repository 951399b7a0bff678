//! Canonical order encoding and order id derivation.
//!
//! Both ledgers call [`derive_order_id`] on the order fields they are
//! handed. A caller that lies about an order's fields simply lands on a
//! different id, so the id never needs to be checked against anything but
//! itself.

use crosslock_types::{Address, Amount, CallId, Order, OrderId};
use sha2::{Digest, Sha256};

use crate::wire::Writer;

const ORDER_ID_DOMAIN: &[u8] = b"crosslock:order_id:v1:";
const CALL_ID_DOMAIN: &[u8] = b"crosslock:call_id:v1:";

/// Full canonical encoding of an order, optional fields included.
#[must_use]
pub fn encode_order(order: &Order) -> Vec<u8> {
    let mut w = Writer::new();
    write_id_fields(&mut w, order);
    w.opt_bytes(order.allowed_taker_dst.as_ref().map(|a| a.as_bytes()))
        .opt_bytes(
            order
                .allowed_cancel_beneficiary_src
                .as_ref()
                .map(|a| a.as_bytes()),
        )
        .opt_bytes(order.external_call.as_deref());
    w.finish()
}

/// Deterministic order id.
///
/// Covers the nonce, maker, both legs, receiver, both authorities and
/// whether an external call is attached (plus its hash when it is). The
/// taker and cancel-beneficiary restrictions are not part of the id.
#[must_use]
pub fn derive_order_id(order: &Order) -> OrderId {
    let mut w = Writer::new();
    write_id_fields(&mut w, order);
    match &order.external_call {
        Some(call) => w.bool(true).fixed(&external_call_hash(call)),
        None => w.bool(false),
    };

    let mut hasher = Sha256::new();
    hasher.update(ORDER_ID_DOMAIN);
    hasher.update(w.finish());
    OrderId::from_bytes(hasher.finalize().into())
}

/// SHA-256 of an encoded external call envelope.
#[must_use]
pub fn external_call_hash(external_call: &[u8]) -> [u8; 32] {
    Sha256::digest(external_call).into()
}

/// Id under which the adapter keeps a registered call.
#[must_use]
pub fn derive_call_id(
    order_id: &OrderId,
    call_authority: &Address,
    token: &Address,
    amount: Amount,
    external_call_hash: &[u8; 32],
) -> CallId {
    let encoded = Writer::new()
        .fixed(order_id.as_bytes())
        .bytes(call_authority.as_bytes())
        .bytes(token.as_bytes())
        .u128(amount)
        .fixed(external_call_hash)
        .finish();

    let mut hasher = Sha256::new();
    hasher.update(CALL_ID_DOMAIN);
    hasher.update(encoded);
    CallId::from_bytes(hasher.finalize().into())
}

fn write_id_fields(w: &mut Writer, order: &Order) {
    w.u64(order.maker_order_nonce)
        .bytes(order.maker_src.as_bytes())
        .u64(order.give_chain_id.0)
        .bytes(order.give_token_address.as_bytes())
        .u128(order.give_amount)
        .u64(order.take_chain_id.0)
        .bytes(order.take_token_address.as_bytes())
        .u128(order.take_amount)
        .bytes(order.receiver_dst.as_bytes())
        .bytes(order.give_patch_authority_src.as_bytes())
        .bytes(order.order_authority_address_dst.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslock_types::ChainId;

    fn sample() -> Order {
        Order {
            maker_order_nonce: 0,
            maker_src: Address::evm_filled(0x01),
            give_chain_id: ChainId(1),
            give_token_address: Address::zero(),
            give_amount: 9_990,
            take_chain_id: ChainId(56),
            take_token_address: Address::evm_filled(0x0b),
            take_amount: 3_000,
            receiver_dst: Address::evm_filled(0x02),
            give_patch_authority_src: Address::evm_filled(0x01),
            order_authority_address_dst: Address::evm_filled(0x03),
            allowed_taker_dst: None,
            allowed_cancel_beneficiary_src: None,
            external_call: None,
        }
    }

    #[test]
    fn id_is_deterministic() {
        assert_eq!(derive_order_id(&sample()), derive_order_id(&sample()));
    }

    #[test]
    fn every_identity_field_changes_the_id() {
        let base = derive_order_id(&sample());
        let variants: Vec<Box<dyn Fn(&mut Order)>> = vec![
            Box::new(|o: &mut Order| o.maker_order_nonce += 1),
            Box::new(|o: &mut Order| o.maker_src = Address::evm_filled(0x09)),
            Box::new(|o: &mut Order| o.give_chain_id = ChainId(2)),
            Box::new(|o: &mut Order| o.give_token_address = Address::evm_filled(0x0c)),
            Box::new(|o: &mut Order| o.give_amount += 1),
            Box::new(|o: &mut Order| o.take_chain_id = ChainId(137)),
            Box::new(|o: &mut Order| o.take_token_address = Address::evm_filled(0x0d)),
            Box::new(|o: &mut Order| o.take_amount += 1),
            Box::new(|o: &mut Order| o.receiver_dst = Address::evm_filled(0x0e)),
            Box::new(|o: &mut Order| o.give_patch_authority_src = Address::evm_filled(0x0f)),
            Box::new(|o: &mut Order| o.order_authority_address_dst = Address::evm_filled(0x10)),
            Box::new(|o: &mut Order| o.external_call = Some(vec![1, 2, 3])),
        ];
        for (i, mutate) in variants.iter().enumerate() {
            let mut order = sample();
            mutate(&mut order);
            assert_ne!(derive_order_id(&order), base, "variant {i} kept the id");
        }
    }

    #[test]
    fn restrictions_are_not_part_of_the_id() {
        let mut order = sample();
        order.allowed_taker_dst = Some(Address::evm_filled(0x44));
        order.allowed_cancel_beneficiary_src = Some(Address::evm_filled(0x45));
        assert_eq!(derive_order_id(&order), derive_order_id(&sample()));
        assert_ne!(encode_order(&order), encode_order(&sample()));
    }

    #[test]
    fn external_call_bytes_matter() {
        let mut a = sample();
        a.external_call = Some(vec![1]);
        let mut b = sample();
        b.external_call = Some(vec![2]);
        assert_ne!(derive_order_id(&a), derive_order_id(&b));
    }

    #[test]
    fn call_id_depends_on_amount() {
        let id = derive_order_id(&sample());
        let hash = external_call_hash(b"call");
        let auth = Address::evm_filled(1);
        let token = Address::zero();
        assert_ne!(
            derive_call_id(&id, &auth, &token, 1, &hash),
            derive_call_id(&id, &auth, &token, 2, &hash)
        );
    }
}
