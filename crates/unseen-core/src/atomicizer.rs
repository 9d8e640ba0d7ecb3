//! Executes a bundle of calls as one unit.
//!
//! Meant to be delegate-called from a user proxy, so every bundled call is
//! made with the proxy as `msg.sender`. If any bundled call fails, the whole
//! bundle reverts.

use alloy_primitives::{Address, Bytes};
use tracing::debug;
use unseen_static::calldata::decode_atomicized;

use crate::error::CallError;
use crate::world::{Code, Frame, World};

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let calls = decode_atomicized(data)?;
	if calls.iter().any(|call| !call.value.is_zero()) {
		return Err(CallError::Revert(
			"atomicizer: native value transfers are not supported".to_string(),
		));
	}

	debug!(sender = %frame.address, calls = calls.len(), "Executing atomicized bundle");
	for call in &calls {
		world.call(frame.address, call.target, &call.data)?;
	}
	Ok(Bytes::new())
}

pub fn deploy(world: &mut World, deployer: Address) -> Result<Address, CallError> {
	world.deploy(deployer, Code::Atomicizer)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokens::Erc20Token;
	use alloy_primitives::U256;
	use unseen_static::calldata::{encode_atomicized, erc20_transfer_from, BundledCall};

	#[test]
	fn test_bundle_is_all_or_nothing() {
		let mut world = World::new(0);
		let holder = Address::repeat_byte(1);
		let relayer = Address::repeat_byte(2);
		let token = Erc20Token::deploy(&mut world, holder, "Token", "TKN").unwrap();
		let atomicizer = deploy(&mut world, holder).unwrap();
		token.mint(&mut world, holder, U256::from(100)).unwrap();
		token.approve(&mut world, holder, relayer, U256::from(100)).unwrap();

		let bundle = |second: u64| {
			encode_atomicized(&[
				BundledCall::new(
					token.address(),
					erc20_transfer_from(holder, Address::repeat_byte(3), U256::from(50)),
				),
				BundledCall::new(
					token.address(),
					erc20_transfer_from(holder, Address::repeat_byte(4), U256::from(second)),
				),
			])
		};

		// Delegate-called from the relayer, so the relayer spends the allowance.
		let frame = Frame {
			address: relayer,
			caller: Address::ZERO,
		};
		assert!(world.delegate_call(&frame, atomicizer, &bundle(60)).is_err());
		assert_eq!(token.balance_of(&world, holder).unwrap(), U256::from(100));

		world.delegate_call(&frame, atomicizer, &bundle(50)).unwrap();
		assert_eq!(token.balance_of(&world, holder).unwrap(), U256::ZERO);
		assert_eq!(token.balance_of(&world, Address::repeat_byte(4)).unwrap(), U256::from(50));
	}

	#[test]
	fn test_bundle_rejects_value() {
		let mut world = World::new(0);
		let atomicizer = deploy(&mut world, Address::repeat_byte(1)).unwrap();
		let mut call = BundledCall::new(Address::repeat_byte(5), vec![0u8; 4]);
		call.value = U256::from(1);
		let result = world.call(Address::repeat_byte(2), atomicizer, &encode_atomicized(&[call]));
		assert!(matches!(result, Err(CallError::Revert(_))));
	}
}
