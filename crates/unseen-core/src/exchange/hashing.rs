//! EIP-712 hashing of orders.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use std::borrow::Cow;
use unseen_types::Order;

use super::ExchangeConfig;

/// Domain separator binding signatures to one exchange deployment.
pub fn domain_separator(config: &ExchangeConfig, exchange: Address) -> B256 {
	Eip712Domain::new(
		Some(Cow::Owned(config.name.clone())),
		Some(Cow::Owned(config.version.clone())),
		Some(U256::from(config.chain_id)),
		Some(exchange),
		None,
	)
	.separator()
}

/// Struct hash of an order. Fills and approvals are keyed by this value.
pub fn hash_order(order: &Order) -> B256 {
	order.to_sol().eip712_hash_struct()
}

/// `keccak256(0x1901 || domainSeparator || hash)`, the digest that gets signed.
pub fn hash_to_sign(domain_separator: B256, hash: B256) -> B256 {
	let mut preimage = [0u8; 66];
	preimage[0] = 0x19;
	preimage[1] = 0x01;
	preimage[2..34].copy_from_slice(domain_separator.as_slice());
	preimage[34..].copy_from_slice(hash.as_slice());
	keccak256(preimage)
}
