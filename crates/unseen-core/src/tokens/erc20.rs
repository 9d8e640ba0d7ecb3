use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use std::collections::HashMap;
use unseen_types::abi::IERC20::{self, IERC20Calls};
use unseen_types::Event;

use crate::error::{CallError, TokenError};
use crate::world::{decode_calls, Code, Frame, World};

#[derive(Debug, Clone, Default)]
pub struct Erc20State {
	pub name: String,
	pub symbol: String,
	pub total_supply: U256,
	balances: HashMap<Address, U256>,
	allowances: HashMap<(Address, Address), U256>,
}

impl Erc20State {
	pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			symbol: symbol.into(),
			..Default::default()
		}
	}

	pub fn balance_of(&self, owner: Address) -> U256 {
		self.balances.get(&owner).copied().unwrap_or_default()
	}

	pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
		self.allowances.get(&(owner, spender)).copied().unwrap_or_default()
	}

	fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
		if to == Address::ZERO {
			return Err(TokenError::ZeroAddress);
		}
		let available = self.balance_of(from);
		if available < amount {
			return Err(TokenError::InsufficientBalance {
				available,
				required: amount,
			});
		}
		self.balances.insert(from, available - amount);
		*self.balances.entry(to).or_default() += amount;
		Ok(())
	}

	fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) -> Result<(), TokenError> {
		let available = self.allowance(owner, spender);
		if available == U256::MAX {
			return Ok(());
		}
		if available < amount {
			return Err(TokenError::InsufficientAllowance {
				available,
				required: amount,
			});
		}
		self.allowances.insert((owner, spender), available - amount);
		Ok(())
	}
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let token = frame.address;
	match decode_calls::<IERC20Calls>(data)? {
		IERC20Calls::transfer(call) => {
			world
				.state_mut::<Erc20State>(token)?
				.move_balance(frame.caller, call.to, call.amount)?;
			world.emit(
				token,
				Event::Transfer {
					from: frame.caller,
					to: call.to,
					value: call.amount,
				},
			)?;
			Ok(true.abi_encode().into())
		}
		IERC20Calls::transferFrom(call) => {
			let state = world.state_mut::<Erc20State>(token)?;
			if frame.caller != call.from {
				state.spend_allowance(call.from, frame.caller, call.amount)?;
			}
			state.move_balance(call.from, call.to, call.amount)?;
			world.emit(
				token,
				Event::Transfer {
					from: call.from,
					to: call.to,
					value: call.amount,
				},
			)?;
			Ok(true.abi_encode().into())
		}
		IERC20Calls::approve(call) => {
			world
				.state_mut::<Erc20State>(token)?
				.allowances
				.insert((frame.caller, call.spender), call.amount);
			world.emit(
				token,
				Event::Approval {
					owner: frame.caller,
					spender: call.spender,
					value: call.amount,
				},
			)?;
			Ok(true.abi_encode().into())
		}
		IERC20Calls::balanceOf(call) => {
			let balance = world.state::<Erc20State>(token)?.balance_of(call.owner);
			Ok(balance.abi_encode().into())
		}
		IERC20Calls::allowance(call) => {
			let allowance = world
				.state::<Erc20State>(token)?
				.allowance(call.owner, call.spender);
			Ok(allowance.abi_encode().into())
		}
	}
}

/// Handle to a deployed ERC20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erc20Token {
	address: Address,
}

impl Erc20Token {
	pub fn deploy(world: &mut World, deployer: Address, name: &str, symbol: &str) -> Result<Self, CallError> {
		let address = world.deploy(deployer, Code::Erc20(Erc20State::new(name, symbol)))?;
		Ok(Self { address })
	}

	pub fn at(address: Address) -> Self {
		Self { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// Credits `amount` to `to` out of thin air.
	pub fn mint(&self, world: &mut World, to: Address, amount: U256) -> Result<(), CallError> {
		let state = world.state_mut::<Erc20State>(self.address)?;
		state.total_supply += amount;
		*state.balances.entry(to).or_default() += amount;
		world.emit(
			self.address,
			Event::Transfer {
				from: Address::ZERO,
				to,
				value: amount,
			},
		)
	}

	pub fn balance_of(&self, world: &World, owner: Address) -> Result<U256, CallError> {
		Ok(world.state::<Erc20State>(self.address)?.balance_of(owner))
	}

	pub fn allowance(&self, world: &World, owner: Address, spender: Address) -> Result<U256, CallError> {
		Ok(world.state::<Erc20State>(self.address)?.allowance(owner, spender))
	}

	pub fn approve(&self, world: &mut World, owner: Address, spender: Address, amount: U256) -> Result<(), CallError> {
		let data = IERC20::approveCall { spender, amount }.abi_encode();
		world.call(owner, self.address, &data).map(drop)
	}

	pub fn transfer(&self, world: &mut World, from: Address, to: Address, amount: U256) -> Result<(), CallError> {
		let data = IERC20::transferCall { to, amount }.abi_encode();
		world.call(from, self.address, &data).map(drop)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn setup() -> (World, Erc20Token, Address, Address) {
		let mut world = World::new(0);
		let owner = Address::repeat_byte(1);
		let spender = Address::repeat_byte(2);
		let token = Erc20Token::deploy(&mut world, owner, "Token", "TKN").unwrap();
		token.mint(&mut world, owner, U256::from(100)).unwrap();
		(world, token, owner, spender)
	}

	fn transfer_from(world: &mut World, token: Erc20Token, spender: Address, from: Address, to: Address, amount: u64) -> Result<Bytes, CallError> {
		let data = IERC20::transferFromCall {
			from,
			to,
			amount: U256::from(amount),
		}
		.abi_encode();
		world.call(spender, token.address(), &data)
	}

	#[test]
	fn test_transfer_from_spends_allowance() {
		let (mut world, token, owner, spender) = setup();
		token.approve(&mut world, owner, spender, U256::from(60)).unwrap();

		transfer_from(&mut world, token, spender, owner, spender, 40).unwrap();
		assert_eq!(token.balance_of(&world, spender).unwrap(), U256::from(40));
		assert_eq!(token.allowance(&world, owner, spender).unwrap(), U256::from(20));

		assert_eq!(
			transfer_from(&mut world, token, spender, owner, spender, 21),
			Err(CallError::Token(TokenError::InsufficientAllowance {
				available: U256::from(20),
				required: U256::from(21),
			}))
		);
	}

	#[test]
	fn test_unlimited_allowance_is_not_spent() {
		let (mut world, token, owner, spender) = setup();
		token.approve(&mut world, owner, spender, U256::MAX).unwrap();
		transfer_from(&mut world, token, spender, owner, spender, 100).unwrap();
		assert_eq!(token.allowance(&world, owner, spender).unwrap(), U256::MAX);
	}

	#[test]
	fn test_transfer_insufficient_balance() {
		let (mut world, token, owner, spender) = setup();
		let result = token.transfer(&mut world, owner, spender, U256::from(101));
		assert!(matches!(
			result,
			Err(CallError::Token(TokenError::InsufficientBalance { .. }))
		));
		assert_eq!(token.balance_of(&world, owner).unwrap(), U256::from(100));
	}

	#[test]
	fn test_balance_of_through_abi() {
		let (mut world, token, owner, _) = setup();
		let data = IERC20::balanceOfCall { owner }.abi_encode();
		let ret = world.static_call(Address::ZERO, token.address(), &data).unwrap();
		assert_eq!(U256::abi_decode(&ret).unwrap(), U256::from(100));
	}
}
