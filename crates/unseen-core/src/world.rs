//! The simulated ledger every contract lives in.
//!
//! Accounts either hold no code (externally owned) or one of the [`Code`]
//! variants, each of which carries its own contract state. Every call runs in
//! a [`Frame`]; a frame that returns an error rolls back all state and logs
//! written since it was entered, so a failing top-level call leaves the world
//! exactly as it found it. Static calls may read anything and write nothing.
//!
//! Rollback is journaled per account: the first write to an account within a
//! frame saves a copy of that account, so entering a frame costs nothing and
//! a write costs one copy of the touched contract's state.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolInterface;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use unseen_types::{Event, Log};

use crate::error::CallError;
use crate::exchange::ExchangeState;
use crate::proxy::ProxyState;
use crate::registry::RegistryState;
use crate::tokens::{Erc1155State, Erc20State, Erc721State};
use crate::wallet::WalletState;
use crate::{atomicizer, exchange, proxy, registry, tokens, wallet};

/// Same bound as the EVM.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Contract logic supplied from outside the crate, e.g. adversarial test contracts.
pub trait Contract: fmt::Debug + Send + Sync {
	fn call(&self, world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError>;
}

/// Code deployed at an address, together with the state it owns.
#[derive(Debug, Clone)]
pub enum Code {
	Erc20(Erc20State),
	Erc721(Erc721State),
	Erc1155(Erc1155State),
	Atomicizer,
	StaticMarket,
	Wallet(WalletState),
	Proxy(ProxyState),
	/// Canonical proxy logic a registry points its proxies at.
	ProxyImplementation,
	Registry(RegistryState),
	Exchange(ExchangeState),
	External(Arc<dyn Contract>),
}

impl Code {
	pub fn kind(&self) -> &'static str {
		match self {
			Code::Erc20(_) => "ERC20",
			Code::Erc721(_) => "ERC721",
			Code::Erc1155(_) => "ERC1155",
			Code::Atomicizer => "Atomicizer",
			Code::StaticMarket => "StaticMarket",
			Code::Wallet(_) => "Wallet",
			Code::Proxy(_) => "AuthenticatedProxy",
			Code::ProxyImplementation => "ProxyImplementation",
			Code::Registry(_) => "ProxyRegistry",
			Code::Exchange(_) => "Exchange",
			Code::External(_) => "External",
		}
	}

	fn handler(&self) -> Handler {
		match self {
			Code::Erc20(_) => Handler::Erc20,
			Code::Erc721(_) => Handler::Erc721,
			Code::Erc1155(_) => Handler::Erc1155,
			Code::Atomicizer => Handler::Atomicizer,
			Code::StaticMarket => Handler::StaticMarket,
			Code::Wallet(_) => Handler::Wallet,
			Code::Proxy(_) => Handler::Proxy,
			Code::ProxyImplementation => Handler::ProxyImplementation,
			Code::Registry(_) => Handler::Registry,
			Code::Exchange(_) => Handler::Exchange,
			Code::External(contract) => Handler::External(Arc::clone(contract)),
		}
	}
}

/// Entry point selected from the code at the called address.
enum Handler {
	Erc20,
	Erc721,
	Erc1155,
	Atomicizer,
	StaticMarket,
	Wallet,
	Proxy,
	ProxyImplementation,
	Registry,
	Exchange,
	External(Arc<dyn Contract>),
}

impl Handler {
	fn run(self, world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
		match self {
			Handler::Erc20 => tokens::erc20::handle(world, frame, data),
			Handler::Erc721 => tokens::erc721::handle(world, frame, data),
			Handler::Erc1155 => tokens::erc1155::handle(world, frame, data),
			Handler::Atomicizer => atomicizer::handle(world, frame, data),
			Handler::StaticMarket => {
				let fill = unseen_static::dispatch(data)?;
				Ok(Bytes::from(fill.to_be_bytes::<32>().to_vec()))
			}
			Handler::Wallet => wallet::handle(world, frame, data),
			Handler::Proxy => proxy::handle(world, frame, data),
			Handler::ProxyImplementation => Err(CallError::Revert(
				"proxy implementation is only reachable through a proxy".to_string(),
			)),
			Handler::Registry => registry::handle(world, frame, data),
			Handler::Exchange => exchange::handle(world, frame, data),
			Handler::External(contract) => contract.call(world, frame, data),
		}
	}
}

/// Execution context of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
	/// Account whose state the running code reads and writes (`address(this)`).
	pub address: Address,
	/// Immediate caller (`msg.sender`).
	pub caller: Address,
}

#[derive(Debug, Clone, Default)]
pub struct Account {
	pub code: Option<Code>,
	pub nonce: u64,
}

/// Access to the state embedded in a [`Code`] variant.
pub trait ContractState: Sized {
	const KIND: &'static str;

	fn from_code(code: &Code) -> Option<&Self>;
	fn from_code_mut(code: &mut Code) -> Option<&mut Self>;
}

macro_rules! contract_state {
	($state:ty, $variant:ident, $kind:literal) => {
		impl ContractState for $state {
			const KIND: &'static str = $kind;

			fn from_code(code: &Code) -> Option<&Self> {
				match code {
					Code::$variant(state) => Some(state),
					_ => None,
				}
			}

			fn from_code_mut(code: &mut Code) -> Option<&mut Self> {
				match code {
					Code::$variant(state) => Some(state),
					_ => None,
				}
			}
		}
	};
}

contract_state!(Erc20State, Erc20, "ERC20");
contract_state!(Erc721State, Erc721, "ERC721");
contract_state!(Erc1155State, Erc1155, "ERC1155");
contract_state!(WalletState, Wallet, "Wallet");
contract_state!(ProxyState, Proxy, "AuthenticatedProxy");
contract_state!(RegistryState, Registry, "ProxyRegistry");
contract_state!(ExchangeState, Exchange, "Exchange");

struct Checkpoint {
	journal: usize,
	logs: usize,
	floor: usize,
}

/// In-memory ledger with call-frame atomicity.
#[derive(Debug, Default)]
pub struct World {
	accounts: HashMap<Address, Account>,
	/// Prior value of every account written by an open frame; `None` if it did not exist.
	journal: Vec<(Address, Option<Account>)>,
	/// Start of the innermost open frame's entries in `journal`.
	journal_floor: usize,
	logs: Vec<Log>,
	timestamp: u64,
	depth: usize,
	static_depth: usize,
}

impl World {
	pub fn new(timestamp: u64) -> Self {
		Self {
			timestamp,
			..Default::default()
		}
	}

	/// Current block timestamp.
	pub fn timestamp(&self) -> u64 {
		self.timestamp
	}

	pub fn set_timestamp(&mut self, timestamp: u64) {
		self.timestamp = timestamp;
	}

	pub fn advance_time(&mut self, seconds: u64) {
		self.timestamp = self.timestamp.saturating_add(seconds);
	}

	pub fn has_code(&self, address: Address) -> bool {
		self.code(address).is_some()
	}

	pub fn code(&self, address: Address) -> Option<&Code> {
		self.accounts.get(&address).and_then(|account| account.code.as_ref())
	}

	pub fn nonce(&self, address: Address) -> u64 {
		self.accounts.get(&address).map(|account| account.nonce).unwrap_or_default()
	}

	/// Whether the current frame is inside a static call.
	pub fn is_static(&self) -> bool {
		self.static_depth > 0
	}

	/// Logs emitted by every committed frame so far.
	pub fn logs(&self) -> &[Log] {
		&self.logs
	}

	/// Drops collected logs. Only meaningful between top-level calls.
	pub fn clear_logs(&mut self) {
		self.logs.clear();
	}

	/// Places `code` at an address derived from the deployer and its nonce.
	pub fn deploy(&mut self, deployer: Address, code: Code) -> Result<Address, CallError> {
		self.ensure_writable()?;

		self.record(deployer);
		let account = self.accounts.entry(deployer).or_default();
		let nonce = account.nonce;
		account.nonce += 1;

		let address = derive_address(deployer, nonce, code.kind());
		if self.has_code(address) {
			return Err(CallError::AddressCollision(address));
		}

		debug!(kind = code.kind(), %address, %deployer, "Deployed contract");
		self.record(address);
		self.accounts.entry(address).or_default().code = Some(code);
		Ok(address)
	}

	/// Calls `target` with `caller` as `msg.sender`.
	///
	/// Calling an address without code succeeds and returns nothing.
	pub fn call(&mut self, caller: Address, target: Address, data: &[u8]) -> Result<Bytes, CallError> {
		self.execute(
			Frame {
				address: target,
				caller,
			},
			target,
			data,
		)
	}

	/// Runs the code at `target` against the state of `frame.address`,
	/// keeping the frame's `msg.sender`.
	pub fn delegate_call(&mut self, frame: &Frame, target: Address, data: &[u8]) -> Result<Bytes, CallError> {
		self.execute(*frame, target, data)
	}

	/// Like [`World::call`], but any state change inside fails with
	/// [`CallError::StaticViolation`].
	pub fn static_call(&mut self, caller: Address, target: Address, data: &[u8]) -> Result<Bytes, CallError> {
		self.static_depth += 1;
		let result = self.call(caller, target, data);
		self.static_depth -= 1;
		result
	}

	fn execute(&mut self, frame: Frame, code_address: Address, data: &[u8]) -> Result<Bytes, CallError> {
		if self.depth >= MAX_CALL_DEPTH {
			return Err(CallError::DepthExceeded);
		}

		let handler = match self.code(code_address) {
			Some(code) => code.handler(),
			None => return Ok(Bytes::new()),
		};

		let checkpoint = (!self.is_static()).then(|| self.checkpoint());
		self.depth += 1;
		let result = handler.run(self, &frame, data);
		self.depth -= 1;

		if let Err(err) = &result {
			debug!(target = %code_address, caller = %frame.caller, error = %err, "Call reverted");
			if let Some(checkpoint) = &checkpoint {
				self.restore(checkpoint);
			}
		}
		if let Some(checkpoint) = checkpoint {
			self.journal_floor = checkpoint.floor;
		}
		if self.depth == 0 {
			self.journal.clear();
			self.journal_floor = 0;
		}
		result
	}

	fn checkpoint(&mut self) -> Checkpoint {
		let checkpoint = Checkpoint {
			journal: self.journal.len(),
			logs: self.logs.len(),
			floor: self.journal_floor,
		};
		self.journal_floor = self.journal.len();
		checkpoint
	}

	/// Undoes every write journaled since `checkpoint`, newest first.
	fn restore(&mut self, checkpoint: &Checkpoint) {
		for (address, prior) in self.journal.drain(checkpoint.journal..).rev() {
			match prior {
				Some(account) => {
					self.accounts.insert(address, account);
				}
				None => {
					self.accounts.remove(&address);
				}
			}
		}
		self.logs.truncate(checkpoint.logs);
	}

	/// Saves `address` before its first write in the current frame.
	/// Writes outside any frame are never rolled back.
	fn record(&mut self, address: Address) {
		if self.depth == 0 {
			return;
		}
		if self.journal[self.journal_floor..]
			.iter()
			.any(|(touched, _)| *touched == address)
		{
			return;
		}
		let prior = self.accounts.get(&address).cloned();
		self.journal.push((address, prior));
	}

	fn ensure_writable(&self) -> Result<(), CallError> {
		if self.is_static() {
			return Err(CallError::StaticViolation);
		}
		Ok(())
	}

	/// Typed read access to a contract's state.
	pub fn state<T: ContractState>(&self, address: Address) -> Result<&T, CallError> {
		self.code(address)
			.and_then(T::from_code)
			.ok_or(CallError::WrongContract {
				address,
				expected: T::KIND,
			})
	}

	pub(crate) fn state_mut<T: ContractState>(&mut self, address: Address) -> Result<&mut T, CallError> {
		self.ensure_writable()?;
		self.record(address);
		self.accounts
			.get_mut(&address)
			.and_then(|account| account.code.as_mut())
			.and_then(T::from_code_mut)
			.ok_or(CallError::WrongContract {
				address,
				expected: T::KIND,
			})
	}

	pub(crate) fn emit(&mut self, address: Address, event: Event) -> Result<(), CallError> {
		self.ensure_writable()?;
		self.logs.push(Log { address, event });
		Ok(())
	}
}

fn derive_address(deployer: Address, nonce: u64, kind: &str) -> Address {
	let mut preimage = Vec::with_capacity(85);
	preimage.push(0xff);
	preimage.extend_from_slice(deployer.as_slice());
	preimage.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
	preimage.extend_from_slice(keccak256(kind.as_bytes()).as_slice());
	let hash: B256 = keccak256(&preimage);
	Address::from_slice(&hash[12..])
}

/// Decodes calldata into an interface's call enum.
pub(crate) fn decode_calls<I: SolInterface>(data: &[u8]) -> Result<I, CallError> {
	I::abi_decode(data).map_err(|e| CallError::InvalidCalldata(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokens::Erc20Token;
	use std::sync::Mutex;

	#[derive(Debug)]
	struct Reverter;

	impl Contract for Reverter {
		fn call(&self, world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
			// Move tokens, then fail: the transfer must not survive.
			let token = Address::from_slice(&data[12..32]);
			Erc20Token::at(token).transfer(world, frame.address, Address::repeat_byte(9), U256::from(1))?;
			Err(CallError::Revert("always".to_string()))
		}
	}

	#[derive(Debug, Default)]
	struct Writer {
		seen: Mutex<Option<CallError>>,
	}

	impl Contract for Writer {
		fn call(&self, world: &mut World, frame: &Frame, _data: &[u8]) -> Result<Bytes, CallError> {
			let result = world.emit(frame.address, Event::Revoked { revoked: true });
			if let Err(err) = result {
				*self.seen.lock().unwrap() = Some(err.clone());
				return Err(err);
			}
			Ok(Bytes::new())
		}
	}

	/// Pays one token, then calls `inner` and swallows its failure.
	#[derive(Debug)]
	struct Outer {
		token: Address,
		inner: Address,
		fail_after: bool,
	}

	impl Contract for Outer {
		fn call(&self, world: &mut World, frame: &Frame, _data: &[u8]) -> Result<Bytes, CallError> {
			Erc20Token::at(self.token).transfer(world, frame.address, Address::repeat_byte(7), U256::from(1))?;
			let mut data = vec![0u8; 12];
			data.extend_from_slice(self.token.as_slice());
			let _ = world.call(frame.address, self.inner, &data);
			world.deploy(frame.address, Code::Atomicizer)?;
			if self.fail_after {
				return Err(CallError::Revert("outer".to_string()));
			}
			Ok(Bytes::new())
		}
	}

	fn nested_world(fail_after: bool) -> (World, Erc20Token, Address, Address) {
		let mut world = World::new(0);
		let deployer = Address::repeat_byte(1);
		let token = Erc20Token::deploy(&mut world, deployer, "Token", "TKN").unwrap();
		let inner = world.deploy(deployer, Code::External(Arc::new(Reverter))).unwrap();
		let outer = world
			.deploy(
				deployer,
				Code::External(Arc::new(Outer {
					token: token.address(),
					inner,
					fail_after,
				})),
			)
			.unwrap();
		token.mint(&mut world, outer, U256::from(10)).unwrap();
		token.mint(&mut world, inner, U256::from(10)).unwrap();
		(world, token, outer, inner)
	}

	#[test]
	fn test_failed_inner_frame_keeps_outer_writes() {
		let (mut world, token, outer, inner) = nested_world(false);

		world.call(Address::ZERO, outer, &[]).unwrap();

		assert_eq!(token.balance_of(&world, outer).unwrap(), U256::from(9));
		assert_eq!(token.balance_of(&world, inner).unwrap(), U256::from(10));
		assert_eq!(token.balance_of(&world, Address::repeat_byte(7)).unwrap(), U256::from(1));
		assert_eq!(token.balance_of(&world, Address::repeat_byte(9)).unwrap(), U256::ZERO);
		assert_eq!(world.nonce(outer), 1);
		assert!(world.journal.is_empty());
	}

	#[test]
	fn test_failed_outer_frame_undoes_deploys_and_writes() {
		let (mut world, token, outer, _) = nested_world(true);
		let accounts = world.accounts.len();

		assert!(world.call(Address::ZERO, outer, &[]).is_err());

		assert_eq!(token.balance_of(&world, outer).unwrap(), U256::from(10));
		assert_eq!(token.balance_of(&world, Address::repeat_byte(7)).unwrap(), U256::ZERO);
		assert_eq!(world.nonce(outer), 0);
		assert_eq!(world.accounts.len(), accounts);
		assert!(world.journal.is_empty());
	}

	#[test]
	fn test_deploy_addresses_are_unique() {
		let mut world = World::new(0);
		let deployer = Address::repeat_byte(1);
		let a = world.deploy(deployer, Code::Atomicizer).unwrap();
		let b = world.deploy(deployer, Code::Atomicizer).unwrap();
		assert_ne!(a, b);
		assert_eq!(world.nonce(deployer), 2);
		assert!(world.has_code(a));
		assert!(!world.has_code(deployer));
	}

	#[test]
	fn test_failed_frame_rolls_back() {
		let mut world = World::new(0);
		let deployer = Address::repeat_byte(1);
		let reverter = world.deploy(deployer, Code::External(Arc::new(Reverter))).unwrap();
		let token = Erc20Token::deploy(&mut world, deployer, "Token", "TKN").unwrap();
		token.mint(&mut world, reverter, U256::from(10)).unwrap();

		let mut data = vec![0u8; 12];
		data.extend_from_slice(token.address().as_slice());
		let result = world.call(deployer, reverter, &data);

		assert_eq!(result, Err(CallError::Revert("always".to_string())));
		assert_eq!(token.balance_of(&world, reverter).unwrap(), U256::from(10));
		assert_eq!(token.balance_of(&world, Address::repeat_byte(9)).unwrap(), U256::ZERO);
	}

	#[test]
	fn test_static_call_is_read_only() {
		let mut world = World::new(0);
		let writer = Arc::new(Writer::default());
		let address = world
			.deploy(Address::repeat_byte(1), Code::External(writer.clone()))
			.unwrap();

		assert!(world.call(Address::ZERO, address, &[]).is_ok());
		assert_eq!(world.logs().len(), 1);

		assert_eq!(
			world.static_call(Address::ZERO, address, &[]),
			Err(CallError::StaticViolation)
		);
		assert_eq!(*writer.seen.lock().unwrap(), Some(CallError::StaticViolation));
		assert_eq!(world.logs().len(), 1);
	}

	#[test]
	fn test_call_without_code_succeeds() {
		let mut world = World::new(0);
		let result = world.call(Address::repeat_byte(1), Address::repeat_byte(2), &[1, 2, 3]);
		assert_eq!(result, Ok(Bytes::new()));
	}

	#[test]
	fn test_wrong_contract_access() {
		let mut world = World::new(0);
		let atomicizer = world.deploy(Address::repeat_byte(1), Code::Atomicizer).unwrap();
		assert!(matches!(
			world.state::<Erc20State>(atomicizer),
			Err(CallError::WrongContract { expected: "ERC20", .. })
		));
	}
}
