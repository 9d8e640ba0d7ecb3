//! Order hashes as an off-chain signer would compute them.

use alloy_primitives::{Address, B256};
use serde::Serialize;
use unseen_config::Config;
use unseen_core::exchange::hashing;
use unseen_core::{Deployment, ExchangeConfig, ExchangeError, World};
use unseen_types::Order;

/// Account that deploys the simulated market.
pub const DEPLOYER: Address = Address::repeat_byte(0x01);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHashes {
	pub exchange: Address,
	pub hash: B256,
	pub domain_separator: B256,
	pub hash_to_sign: B256,
}

pub fn order_hashes(config: &ExchangeConfig, exchange: Address, order: &Order) -> OrderHashes {
	let hash = hashing::hash_order(order);
	let domain_separator = hashing::domain_separator(config, exchange);
	OrderHashes {
		exchange,
		hash,
		domain_separator,
		hash_to_sign: hashing::hash_to_sign(domain_separator, hash),
	}
}

/// Address the exchange gets when `unseen simulate` deploys the market.
pub fn default_exchange_address(config: &Config) -> Result<Address, ExchangeError> {
	let mut world = World::new(config.simulation.start_timestamp);
	let deployment = Deployment::deploy(
		&mut world,
		DEPLOYER,
		config.exchange.clone(),
		config.registry.delay_period_secs,
	)?;
	Ok(deployment.exchange.address())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_matches_deployed_exchange_views() {
		let config = Config::default();
		let mut world = World::new(config.simulation.start_timestamp);
		let deployment = Deployment::deploy(
			&mut world,
			DEPLOYER,
			config.exchange.clone(),
			config.registry.delay_period_secs,
		)
		.unwrap();
		let order = Order {
			maker: Address::repeat_byte(0x11),
			executer: Address::repeat_byte(0x11),
			..Default::default()
		};

		let exchange = default_exchange_address(&config).unwrap();
		assert_eq!(exchange, deployment.exchange.address());

		let hashes = order_hashes(&config.exchange, exchange, &order);
		assert_eq!(hashes.hash, deployment.exchange.hash_order(&order));
		assert_eq!(
			hashes.hash_to_sign,
			deployment.exchange.hash_to_sign(&world, hashes.hash).unwrap()
		);
	}

	#[test]
	fn test_chain_id_changes_signing_hash_only() {
		let order = Order::default();
		let mainnet = order_hashes(&ExchangeConfig::default(), Address::repeat_byte(9), &order);
		let other = order_hashes(
			&ExchangeConfig {
				chain_id: 10,
				..Default::default()
			},
			Address::repeat_byte(9),
			&order,
		);
		assert_eq!(mainnet.hash, other.hash);
		assert_ne!(mainnet.hash_to_sign, other.hash_to_sign);
	}
}
