use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use std::collections::{HashMap, HashSet};
use unseen_types::abi::IERC721::{self, IERC721Calls};
use unseen_types::Event;

use crate::error::{CallError, TokenError};
use crate::world::{decode_calls, Code, Frame, World};

/// Non-fungible token with owner-gated minting.
///
/// The collection owner, or any operator the owner approved for all, may
/// mint. Approving a user proxy as operator is what enables lazy minting
/// through the exchange.
#[derive(Debug, Clone, Default)]
pub struct Erc721State {
	pub name: String,
	/// Account allowed to mint.
	pub minter: Address,
	owners: HashMap<U256, Address>,
	balances: HashMap<Address, U256>,
	token_approvals: HashMap<U256, Address>,
	operators: HashSet<(Address, Address)>,
}

impl Erc721State {
	pub fn new(name: impl Into<String>, minter: Address) -> Self {
		Self {
			name: name.into(),
			minter,
			..Default::default()
		}
	}

	pub fn owner_of(&self, token_id: U256) -> Option<Address> {
		self.owners.get(&token_id).copied()
	}

	pub fn balance_of(&self, owner: Address) -> U256 {
		self.balances.get(&owner).copied().unwrap_or_default()
	}

	pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
		self.operators.contains(&(owner, operator))
	}

	fn transfer(&mut self, caller: Address, from: Address, to: Address, token_id: U256) -> Result<(), TokenError> {
		let owner = self.owner_of(token_id).ok_or(TokenError::NonexistentToken(token_id))?;
		if owner != from {
			return Err(TokenError::WrongOwner(from));
		}
		if to == Address::ZERO {
			return Err(TokenError::ZeroAddress);
		}
		let approved = self.token_approvals.get(&token_id) == Some(&caller);
		if caller != owner && !approved && !self.is_approved_for_all(owner, caller) {
			return Err(TokenError::NotAuthorized(caller));
		}

		self.token_approvals.remove(&token_id);
		self.owners.insert(token_id, to);
		*self.balances.entry(from).or_default() -= U256::from(1);
		*self.balances.entry(to).or_default() += U256::from(1);
		Ok(())
	}

	fn mint(&mut self, caller: Address, to: Address, token_id: U256) -> Result<(), TokenError> {
		if caller != self.minter && !self.is_approved_for_all(self.minter, caller) {
			return Err(TokenError::NotAuthorized(caller));
		}
		if to == Address::ZERO {
			return Err(TokenError::ZeroAddress);
		}
		if self.owners.contains_key(&token_id) {
			return Err(TokenError::AlreadyMinted(token_id));
		}
		self.owners.insert(token_id, to);
		*self.balances.entry(to).or_default() += U256::from(1);
		Ok(())
	}
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let token = frame.address;
	match decode_calls::<IERC721Calls>(data)? {
		IERC721Calls::transferFrom(call) => {
			world
				.state_mut::<Erc721State>(token)?
				.transfer(frame.caller, call.from, call.to, call.tokenId)?;
			world.emit(
				token,
				Event::Transfer {
					from: call.from,
					to: call.to,
					value: call.tokenId,
				},
			)?;
			Ok(Bytes::new())
		}
		IERC721Calls::approve(call) => {
			let state = world.state_mut::<Erc721State>(token)?;
			let owner = state
				.owner_of(call.tokenId)
				.ok_or(TokenError::NonexistentToken(call.tokenId))?;
			if frame.caller != owner && !state.is_approved_for_all(owner, frame.caller) {
				return Err(TokenError::NotAuthorized(frame.caller).into());
			}
			state.token_approvals.insert(call.tokenId, call.to);
			world.emit(
				token,
				Event::Approval {
					owner,
					spender: call.to,
					value: call.tokenId,
				},
			)?;
			Ok(Bytes::new())
		}
		IERC721Calls::setApprovalForAll(call) => {
			let operators = &mut world.state_mut::<Erc721State>(token)?.operators;
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
		IERC721Calls::ownerOf(call) => {
			let owner = world
				.state::<Erc721State>(token)?
				.owner_of(call.tokenId)
				.ok_or(TokenError::NonexistentToken(call.tokenId))?;
			Ok(owner.abi_encode().into())
		}
		IERC721Calls::mint(call) => {
			world
				.state_mut::<Erc721State>(token)?
				.mint(frame.caller, call.to, call.tokenId)?;
			world.emit(
				token,
				Event::Transfer {
					from: Address::ZERO,
					to: call.to,
					value: call.tokenId,
				},
			)?;
			Ok(Bytes::new())
		}
	}
}

/// Handle to a deployed ERC721 collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erc721Token {
	address: Address,
}

impl Erc721Token {
	/// Deploys a collection whose minter is the deployer.
	pub fn deploy(world: &mut World, deployer: Address, name: &str) -> Result<Self, CallError> {
		let address = world.deploy(deployer, Code::Erc721(Erc721State::new(name, deployer)))?;
		Ok(Self { address })
	}

	pub fn at(address: Address) -> Self {
		Self { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn mint(&self, world: &mut World, minter: Address, to: Address, token_id: U256) -> Result<(), CallError> {
		let data = IERC721::mintCall { to, tokenId: token_id }.abi_encode();
		world.call(minter, self.address, &data).map(drop)
	}

	pub fn owner_of(&self, world: &World, token_id: U256) -> Result<Option<Address>, CallError> {
		Ok(world.state::<Erc721State>(self.address)?.owner_of(token_id))
	}

	pub fn set_approval_for_all(
		&self,
		world: &mut World,
		owner: Address,
		operator: Address,
		approved: bool,
	) -> Result<(), CallError> {
		let data = IERC721::setApprovalForAllCall { operator, approved }.abi_encode();
		world.call(owner, self.address, &data).map(drop)
	}

	pub fn transfer_from(
		&self,
		world: &mut World,
		caller: Address,
		from: Address,
		to: Address,
		token_id: U256,
	) -> Result<(), CallError> {
		let data = IERC721::transferFromCall {
			from,
			to,
			tokenId: token_id,
		}
		.abi_encode();
		world.call(caller, self.address, &data).map(drop)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn setup() -> (World, Erc721Token, Address) {
		let mut world = World::new(0);
		let creator = Address::repeat_byte(1);
		let nft = Erc721Token::deploy(&mut world, creator, "Collection").unwrap();
		(world, nft, creator)
	}

	#[test]
	fn test_mint_requires_minter_or_operator() {
		let (mut world, nft, creator) = setup();
		let operator = Address::repeat_byte(2);
		let buyer = Address::repeat_byte(3);

		assert_eq!(
			nft.mint(&mut world, operator, buyer, U256::from(1)),
			Err(CallError::Token(TokenError::NotAuthorized(operator)))
		);

		nft.set_approval_for_all(&mut world, creator, operator, true).unwrap();
		nft.mint(&mut world, operator, buyer, U256::from(1)).unwrap();
		assert_eq!(nft.owner_of(&world, U256::from(1)).unwrap(), Some(buyer));

		assert_eq!(
			nft.mint(&mut world, creator, buyer, U256::from(1)),
			Err(CallError::Token(TokenError::AlreadyMinted(U256::from(1))))
		);
	}

	#[test]
	fn test_transfer_authorization() {
		let (mut world, nft, creator) = setup();
		let holder = Address::repeat_byte(4);
		let stranger = Address::repeat_byte(5);
		nft.mint(&mut world, creator, holder, U256::from(7)).unwrap();

		assert_eq!(
			nft.transfer_from(&mut world, stranger, holder, stranger, U256::from(7)),
			Err(CallError::Token(TokenError::NotAuthorized(stranger)))
		);
		assert_eq!(
			nft.transfer_from(&mut world, holder, stranger, holder, U256::from(7)),
			Err(CallError::Token(TokenError::WrongOwner(stranger)))
		);

		nft.set_approval_for_all(&mut world, holder, stranger, true).unwrap();
		nft.transfer_from(&mut world, stranger, holder, stranger, U256::from(7)).unwrap();
		assert_eq!(nft.owner_of(&world, U256::from(7)).unwrap(), Some(stranger));
		assert_eq!(
			world.state::<Erc721State>(nft.address()).unwrap().balance_of(holder),
			U256::ZERO
		);
	}
}
