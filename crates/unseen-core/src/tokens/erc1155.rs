use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use std::collections::{HashMap, HashSet};
use unseen_types::abi::IERC1155::{self, IERC1155Calls};
use unseen_types::Event;

use crate::error::{CallError, TokenError};
use crate::world::{decode_calls, Code, Frame, World};

/// Multi-token balances. Receiver acknowledgement hooks are not modelled.
#[derive(Debug, Clone, Default)]
pub struct Erc1155State {
	balances: HashMap<(Address, U256), U256>,
	operators: HashSet<(Address, Address)>,
}

impl Erc1155State {
	pub fn balance_of(&self, owner: Address, id: U256) -> U256 {
		self.balances.get(&(owner, id)).copied().unwrap_or_default()
	}

	pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
		self.operators.contains(&(owner, operator))
	}
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let token = frame.address;
	match decode_calls::<IERC1155Calls>(data)? {
		IERC1155Calls::safeTransferFrom(call) => {
			let state = world.state_mut::<Erc1155State>(token)?;
			if frame.caller != call.from && !state.is_approved_for_all(call.from, frame.caller) {
				return Err(TokenError::NotAuthorized(frame.caller).into());
			}
			if call.to == Address::ZERO {
				return Err(TokenError::ZeroAddress.into());
			}
			let available = state.balance_of(call.from, call.id);
			if available < call.amount {
				return Err(TokenError::InsufficientBalance {
					available,
					required: call.amount,
				}
				.into());
			}
			state.balances.insert((call.from, call.id), available - call.amount);
			*state.balances.entry((call.to, call.id)).or_default() += call.amount;

			world.emit(
				token,
				Event::TransferSingle {
					operator: frame.caller,
					from: call.from,
					to: call.to,
					id: call.id,
					value: call.amount,
				},
			)?;
			Ok(Bytes::new())
		}
		IERC1155Calls::setApprovalForAll(call) => {
			let operators = &mut world.state_mut::<Erc1155State>(token)?.operators;
			if call.approved {
				operators.insert((frame.caller, call.operator));
			} else {
				operators.remove(&(frame.caller, call.operator));
			}
			world.emit(
				token,
				Event::ApprovalForAll {
					owner: frame.caller,
					operator: call.operator,
					approved: call.approved,
				},
			)?;
			Ok(Bytes::new())
		}
		IERC1155Calls::balanceOf(call) => {
			let balance = world
				.state::<Erc1155State>(token)?
				.balance_of(call.owner, call.id);
			Ok(balance.abi_encode().into())
		}
	}
}

/// Handle to a deployed ERC1155.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erc1155Token {
	address: Address,
}

impl Erc1155Token {
	pub fn deploy(world: &mut World, deployer: Address) -> Result<Self, CallError> {
		let address = world.deploy(deployer, Code::Erc1155(Erc1155State::default()))?;
		Ok(Self { address })
	}

	pub fn at(address: Address) -> Self {
		Self { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// Credits `amount` units of `id` to `to`.
	pub fn mint(&self, world: &mut World, to: Address, id: U256, amount: U256) -> Result<(), CallError> {
		*world
			.state_mut::<Erc1155State>(self.address)?
			.balances
			.entry((to, id))
			.or_default() += amount;
		world.emit(
			self.address,
			Event::TransferSingle {
				operator: Address::ZERO,
				from: Address::ZERO,
				to,
				id,
				value: amount,
			},
		)
	}

	pub fn balance_of(&self, world: &World, owner: Address, id: U256) -> Result<U256, CallError> {
		Ok(world.state::<Erc1155State>(self.address)?.balance_of(owner, id))
	}

	pub fn set_approval_for_all(
		&self,
		world: &mut World,
		owner: Address,
		operator: Address,
		approved: bool,
	) -> Result<(), CallError> {
		let data = IERC1155::setApprovalForAllCall { operator, approved }.abi_encode();
		world.call(owner, self.address, &data).map(drop)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_operator_transfer() {
		let mut world = World::new(0);
		let holder = Address::repeat_byte(1);
		let operator = Address::repeat_byte(2);
		let token = Erc1155Token::deploy(&mut world, holder).unwrap();
		token.mint(&mut world, holder, U256::from(3), U256::from(10)).unwrap();

		let data = IERC1155::safeTransferFromCall {
			from: holder,
			to: operator,
			id: U256::from(3),
			amount: U256::from(4),
			data: Bytes::new(),
		}
		.abi_encode();

		assert_eq!(
			world.call(operator, token.address(), &data),
			Err(CallError::Token(TokenError::NotAuthorized(operator)))
		);

		token.set_approval_for_all(&mut world, holder, operator, true).unwrap();
		world.call(operator, token.address(), &data).unwrap();
		assert_eq!(token.balance_of(&world, holder, U256::from(3)).unwrap(), U256::from(6));
		assert_eq!(token.balance_of(&world, operator, U256::from(3)).unwrap(), U256::from(4));
	}
}
