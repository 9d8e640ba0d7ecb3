use alloy_primitives::{Address, U256};
use thiserror::Error;
use unseen_types::OrderSide;

use crate::error::CallError;

/// Why an order's parameters do not allow it to be matched right now.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
	#[error("order is not listed until {listing_time}")]
	NotYetListed { listing_time: u64 },

	#[error("order expired at {expiration_time}")]
	Expired { expiration_time: u64 },

	#[error("order is already filled")]
	AlreadyFilled,

	#[error("static target has no code")]
	StaticTargetMissing,
}

/// Errors raised by the exchange.
///
/// Every failure tied to one order of a match names the side it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
	#[error("{side} order has invalid parameters: {reason}")]
	InvalidParameters {
		side: OrderSide,
		reason: ParameterError,
	},

	#[error("Self-matching orders is prohibited")]
	SelfMatch,

	#[error("Invalid signature payload: {0}")]
	InvalidSignatures(String),

	#[error("{side} order failed authorization")]
	Unauthorized { side: OrderSide },

	#[error("{side} order uses untrusted registry {registry}")]
	UntrustedRegistry { side: OrderSide, registry: Address },

	#[error("{side} call target {target} has no code")]
	TargetHasNoCode { side: OrderSide, target: Address },

	#[error("{side} order executer {user} has no proxy")]
	ProxyMissing { side: OrderSide, user: Address },

	#[error("{side} proxy {proxy} does not run the registry implementation")]
	StaleProxyImplementation { side: OrderSide, proxy: Address },

	#[error("{side} proxied call reverted")]
	ProxiedCallReverted { side: OrderSide },

	#[error("{side} call failed: {source}")]
	CallFailed { side: OrderSide, source: CallError },

	#[error("{side} static call failed: {source}")]
	StaticCallFailed { side: OrderSide, source: CallError },

	#[error("Reentrant call")]
	Reentrancy,

	#[error("Order hash already approved")]
	AlreadyApproved,

	#[error("Only the order executer may approve the order")]
	NotOrderExecuter,

	#[error("Only the exchange owner may do this")]
	NotOwner,

	#[error("Protocol fee of {bps} basis points exceeds 100%")]
	FeeTooHigh { bps: U256 },

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Call error: {0}")]
	Call(CallError),
}

/// Exchange errors travel through call frames boxed inside [`CallError`];
/// unwrap them again at the boundary.
impl From<CallError> for ExchangeError {
	fn from(err: CallError) -> Self {
		match err {
			CallError::Exchange(inner) => *inner,
			other => ExchangeError::Call(other),
		}
	}
}
