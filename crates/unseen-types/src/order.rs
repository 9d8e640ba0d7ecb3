//! Order and call types.
//!
//! An [`Order`] is one side's intent to trade. Only its hash and the fill
//! recorded against it persist in the exchange; the order itself is supplied
//! again with every match attempt.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::abi;

/// Bit offset of the listing time inside `extra_data`.
const LISTING_TIME_SHIFT: usize = 192;
/// Bit offset of the expiration time inside `extra_data`.
const EXPIRATION_TIME_SHIFT: usize = 128;

/// How a proxy executes a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HowToCall {
	/// Plain call; the proxy is `msg.sender` of the target.
	#[default]
	Call,
	/// Delegate call; the target's code runs in the proxy's context.
	DelegateCall,
}

impl HowToCall {
	pub fn to_u8(self) -> u8 {
		match self {
			HowToCall::Call => 0,
			HowToCall::DelegateCall => 1,
		}
	}

	pub fn from_u8(value: u8) -> Option<Self> {
		match value {
			0 => Some(HowToCall::Call),
			1 => Some(HowToCall::DelegateCall),
			_ => None,
		}
	}
}

/// Identifies which side of a match an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
	First,
	Second,
}

impl fmt::Display for OrderSide {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderSide::First => write!(f, "first"),
			OrderSide::Second => write!(f, "second"),
		}
	}
}

/// One concrete invocation to be proxied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
	/// Contract the proxy calls into.
	pub target: Address,
	/// Call or delegate call.
	pub how_to_call: HowToCall,
	/// Raw calldata.
	pub data: Bytes,
}

impl Call {
	pub fn new(target: Address, how_to_call: HowToCall, data: impl Into<Bytes>) -> Self {
		Self {
			target,
			how_to_call,
			data: data.into(),
		}
	}
}

/// A maker's intent to trade, validated at match time by a static predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Proxy registry the order is scoped to.
	pub registry: Address,
	/// Economic owner of the order; fills are recorded against this address.
	pub maker: Address,
	/// Account that signs or submits the order, and whose proxy executes its call.
	pub executer: Address,
	/// Contract holding the static predicate.
	pub static_target: Address,
	/// Predicate entry point on `static_target`.
	pub static_selector: FixedBytes<4>,
	/// Predicate configuration, decoded per trade shape.
	pub static_extradata: Bytes,
	/// Fill ceiling.
	pub maximum_fill: U256,
	/// `listingTime (64) | expirationTime (64) | salt (128)`.
	pub extra_data: U256,
}

impl Order {
	/// Packs listing time, expiration time and salt into the `extra_data` word.
	pub fn pack_extra_data(listing_time: u64, expiration_time: u64, salt: u128) -> U256 {
		(U256::from(listing_time) << LISTING_TIME_SHIFT)
			| (U256::from(expiration_time) << EXPIRATION_TIME_SHIFT)
			| U256::from(salt)
	}

	/// Unix timestamp from which the order may be matched.
	pub fn listing_time(&self) -> u64 {
		(self.extra_data >> LISTING_TIME_SHIFT).to::<u64>()
	}

	/// Unix timestamp after which the order may no longer be matched; zero never expires.
	pub fn expiration_time(&self) -> u64 {
		((self.extra_data >> EXPIRATION_TIME_SHIFT) & U256::from(u64::MAX)).to::<u64>()
	}

	pub fn salt(&self) -> u128 {
		(self.extra_data & U256::from(u128::MAX)).to::<u128>()
	}

	/// Converts into the Solidity struct used for hashing and ABI encoding.
	pub fn to_sol(&self) -> abi::Order {
		abi::Order {
			registry: self.registry,
			maker: self.maker,
			executer: self.executer,
			staticTarget: self.static_target,
			staticSelector: self.static_selector,
			staticExtradata: self.static_extradata.clone(),
			maximumFill: self.maximum_fill,
			extraData: self.extra_data,
		}
	}
}

impl From<abi::Order> for Order {
	fn from(order: abi::Order) -> Self {
		Self {
			registry: order.registry,
			maker: order.maker,
			executer: order.executer,
			static_target: order.staticTarget,
			static_selector: order.staticSelector,
			static_extradata: order.staticExtradata,
			maximum_fill: order.maximumFill,
			extra_data: order.extraData,
		}
	}
}

impl Call {
	pub fn to_sol(&self) -> abi::Call {
		abi::Call {
			target: self.target,
			howToCall: self.how_to_call.to_u8(),
			data: self.data.clone(),
		}
	}

	/// Converts from the ABI form, rejecting unknown call kinds.
	pub fn from_sol(call: abi::Call) -> Option<Self> {
		Some(Self {
			target: call.target,
			how_to_call: HowToCall::from_u8(call.howToCall)?,
			data: call.data,
		})
	}
}
