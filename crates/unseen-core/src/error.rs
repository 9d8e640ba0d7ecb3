use alloy_primitives::{Address, U256};
use thiserror::Error;
use unseen_static::StaticError;

use crate::exchange::ExchangeError;

/// Reasons a call frame reverts.
///
/// A reverted frame discards every state change made since it was entered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
	#[error("Contract at {address} is not a {expected}")]
	WrongContract {
		address: Address,
		expected: &'static str,
	},

	#[error("Invalid calldata: {0}")]
	InvalidCalldata(String),

	#[error("State modification attempted during a static call")]
	StaticViolation,

	#[error("Maximum call depth exceeded")]
	DepthExceeded,

	#[error("Address {0} already holds code")]
	AddressCollision(Address),

	#[error("Reverted: {0}")]
	Revert(String),

	#[error("Token error: {0}")]
	Token(#[from] TokenError),

	#[error("Proxy error: {0}")]
	Proxy(#[from] ProxyError),

	#[error("Registry error: {0}")]
	Registry(#[from] RegistryError),

	#[error("Static predicate rejected: {0}")]
	Static(#[from] StaticError),

	#[error("Exchange error: {0}")]
	Exchange(Box<ExchangeError>),
}

impl From<ExchangeError> for CallError {
	fn from(err: ExchangeError) -> Self {
		CallError::Exchange(Box::new(err))
	}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
	#[error("Insufficient balance: {available} < {required}")]
	InsufficientBalance { available: U256, required: U256 },

	#[error("Insufficient allowance: {available} < {required}")]
	InsufficientAllowance { available: U256, required: U256 },

	#[error("Caller {0} is not authorized to move this token")]
	NotAuthorized(Address),

	#[error("Token {0} does not exist")]
	NonexistentToken(U256),

	#[error("Token {0} already minted")]
	AlreadyMinted(U256),

	#[error("{0} is not the owner of the token")]
	WrongOwner(Address),

	#[error("Transfer to the zero address")]
	ZeroAddress,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
	#[error("Proxy already initialized")]
	AlreadyInitialized,

	#[error("Caller {0} may not use this proxy")]
	Unauthorized(Address),

	#[error("Only the proxy owner may do this")]
	NotOwner,

	#[error("Proxied call failed")]
	CallFailed,

	#[error("Invalid implementation {0}")]
	InvalidImplementation(Address),

	#[error("Invalid new owner {0}")]
	InvalidOwner(Address),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("Only the registry owner may do this")]
	NotOwner,

	#[error("Initial authentication already granted")]
	InitialAuthenticationSet,

	#[error("Contract {0} is already allowed")]
	AlreadyAllowed(Address),

	#[error("Contract {0} already has a pending grant")]
	AlreadyPending(Address),

	#[error("Contract {0} has no pending grant")]
	NotPending(Address),

	#[error("Grant for {addr} is still timelocked until after {unlocks_at}")]
	Timelocked { addr: Address, unlocks_at: u64 },

	#[error("User {0} already has a proxy")]
	ProxyExists(Address),

	#[error("Only the proxy itself may transfer its access")]
	NotProxy,
}
