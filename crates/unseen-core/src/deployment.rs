//! Deploys a complete market: registry, exchange, static predicates and
//! atomicizer, with the exchange already authorized on the registry.

use alloy_primitives::Address;
use tracing::info;

use crate::atomicizer;
use crate::exchange::{ExchangeConfig, ExchangeCore, ExchangeError};
use crate::registry::ProxyRegistry;
use crate::world::{Code, World};

#[derive(Debug, Clone, Copy)]
pub struct Deployment {
	pub owner: Address,
	pub registry: ProxyRegistry,
	pub exchange: ExchangeCore,
	pub static_market: Address,
	pub atomicizer: Address,
}

impl Deployment {
	pub fn deploy(
		world: &mut World,
		owner: Address,
		config: ExchangeConfig,
		delay_period: u64,
	) -> Result<Self, ExchangeError> {
		let registry = ProxyRegistry::deploy(world, owner, delay_period)?;
		let exchange = ExchangeCore::deploy(world, owner, config, &[registry.address()])?;
		registry.grant_initial_authentication(world, owner, exchange.address())?;
		let static_market = world.deploy(owner, Code::StaticMarket)?;
		let atomicizer = atomicizer::deploy(world, owner)?;

		info!(
			registry = %registry.address(),
			exchange = %exchange.address(),
			%static_market,
			%atomicizer,
			"Market deployed"
		);
		Ok(Self {
			owner,
			registry,
			exchange,
			static_market,
			atomicizer,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_exchange_is_authorized_on_registry() {
		let mut world = World::new(1);
		let owner = Address::repeat_byte(1);
		let deployment = Deployment::deploy(&mut world, owner, ExchangeConfig::default(), 60).unwrap();

		assert!(deployment
			.registry
			.is_allowed(&world, deployment.exchange.address())
			.unwrap());
		assert!(world.has_code(deployment.static_market));
		assert!(world.has_code(deployment.atomicizer));
		assert_eq!(deployment.exchange.state(&world).unwrap().owner, owner);
	}

	#[test]
	fn test_invalid_config_deploys_nothing_usable() {
		let mut world = World::new(1);
		let config = ExchangeConfig {
			protocol_fee_bps: 10_001,
			..Default::default()
		};
		assert!(matches!(
			Deployment::deploy(&mut world, Address::repeat_byte(1), config, 60),
			Err(ExchangeError::FeeTooHigh { .. })
		));
	}
}
