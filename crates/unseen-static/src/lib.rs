//! Static predicate validators for the Unseen exchange.
//!
//! A static predicate inspects the raw calldata of both proxied calls of a
//! match and asserts that it encodes exactly the transfers the order agreed
//! to. Each trade shape is a standalone pure function registered under the
//! 4-byte selector of its Solidity entry point; the exchange reaches them
//! through [`dispatch`] with selector-prefixed, ABI-encoded arguments.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::SolCall;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use unseen_types::abi::IStaticMarket;
use unseen_types::HowToCall;

pub mod array_utils;
pub mod calldata;
pub mod extra;

mod shapes {
	pub mod bundle;
	pub mod fungible;
	pub mod lazy_mint;
	pub mod nft;
	pub mod trivial;
}

pub use shapes::bundle::split_fee;

/// Basis-point denominator for protocol fees.
pub const INVERSE_BASIS_POINT: u64 = 10_000;

/// Which of the two calls a check refers to, from the predicate's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSide {
	Call,
	Countercall,
}

impl fmt::Display for CallSide {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CallSide::Call => write!(f, "call"),
			CallSide::Countercall => write!(f, "countercall"),
		}
	}
}

/// Reasons a static predicate rejects a match.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StaticError {
	#[error("Unknown predicate selector {0}")]
	UnknownSelector(FixedBytes<4>),
	#[error("{side} must be a {expected:?}")]
	WrongCallKind { side: CallSide, expected: HowToCall },
	#[error("Malformed calldata: {0}")]
	Decode(String),
	#[error("Unexpected function selector {found}, expected {expected}")]
	SelectorMismatch {
		expected: FixedBytes<4>,
		found: FixedBytes<4>,
	},
	#[error("{0} target does not match the configured contract")]
	TargetMismatch(CallSide),
	#[error("{0} must be larger than zero")]
	ZeroTerm(&'static str),
	#[error("Amounts do not satisfy the configured ratio")]
	WrongRatio,
	#[error("New fill {new_fill} exceeds maximum fill {maximum_fill}")]
	FillExceedsMaximum { new_fill: U256, maximum_fill: U256 },
	#[error("Protocol fee mismatch: expected {expected}, got {actual}")]
	FeeMismatch { expected: U256, actual: U256 },
	#[error("{0} calldata does not match the expected transfer")]
	CalldataMismatch(CallSide),
	#[error("Invalid bundle: {0}")]
	InvalidBundle(String),
	#[error("Arithmetic overflow")]
	Overflow,
}

/// Index of each entry in the `addresses` argument.
pub mod address_index {
	pub const REGISTRY: usize = 0;
	pub const MAKER: usize = 1;
	pub const CALL_TARGET: usize = 2;
	pub const COUNTER_REGISTRY: usize = 3;
	pub const COUNTER_MAKER: usize = 4;
	pub const COUNTER_CALL_TARGET: usize = 5;
	pub const FEE_RECIPIENT: usize = 6;
}

/// Index of each entry in the `uints` argument.
pub mod uint_index {
	pub const PROTOCOL_FEE_BPS: usize = 0;
	pub const MAXIMUM_FILL: usize = 1;
	pub const PREVIOUS_FILL: usize = 2;
}

/// Arguments every predicate receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateArgs {
	/// Order-specific configuration (`staticExtradata`).
	pub extra: Bytes,
	pub addresses: [Address; 7],
	pub how_to_calls: [HowToCall; 2],
	pub uints: [U256; 3],
	/// Calldata of the order's own call.
	pub data: Bytes,
	/// Calldata of the counter-order's call.
	pub counterdata: Bytes,
}

impl PredicateArgs {
	pub fn maker(&self) -> Address {
		self.addresses[address_index::MAKER]
	}

	pub fn counter_maker(&self) -> Address {
		self.addresses[address_index::COUNTER_MAKER]
	}

	pub fn call_target(&self) -> Address {
		self.addresses[address_index::CALL_TARGET]
	}

	pub fn counter_call_target(&self) -> Address {
		self.addresses[address_index::COUNTER_CALL_TARGET]
	}

	pub fn fee_recipient(&self) -> Address {
		self.addresses[address_index::FEE_RECIPIENT]
	}

	pub fn protocol_fee_bps(&self) -> U256 {
		self.uints[uint_index::PROTOCOL_FEE_BPS]
	}

	pub fn maximum_fill(&self) -> U256 {
		self.uints[uint_index::MAXIMUM_FILL]
	}

	pub fn previous_fill(&self) -> U256 {
		self.uints[uint_index::PREVIOUS_FILL]
	}

	/// Asserts the kind of both calls.
	pub(crate) fn require_call_kinds(
		&self,
		call: HowToCall,
		countercall: HowToCall,
	) -> Result<(), StaticError> {
		if self.how_to_calls[0] != call {
			return Err(StaticError::WrongCallKind {
				side: CallSide::Call,
				expected: call,
			});
		}
		if self.how_to_calls[1] != countercall {
			return Err(StaticError::WrongCallKind {
				side: CallSide::Countercall,
				expected: countercall,
			});
		}
		Ok(())
	}

	/// Asserts that a call goes to the contract named in the order's configuration.
	pub(crate) fn require_target(&self, side: CallSide, expected: Address) -> Result<(), StaticError> {
		let actual = match side {
			CallSide::Call => self.call_target(),
			CallSide::Countercall => self.counter_call_target(),
		};
		if actual != expected {
			return Err(StaticError::TargetMismatch(side));
		}
		Ok(())
	}

	/// Asserts that a call's payload is byte-identical to `expected`.
	pub(crate) fn require_calldata(&self, side: CallSide, expected: &[u8]) -> Result<(), StaticError> {
		let actual = match side {
			CallSide::Call => &self.data,
			CallSide::Countercall => &self.counterdata,
		};
		if !array_utils::array_eq(actual, expected) {
			return Err(StaticError::CalldataMismatch(side));
		}
		Ok(())
	}

	/// Adds `delivered` to the previous fill and checks it against the maximum.
	pub(crate) fn next_fill(&self, delivered: U256) -> Result<U256, StaticError> {
		let new_fill = self
			.previous_fill()
			.checked_add(delivered)
			.ok_or(StaticError::Overflow)?;
		if new_fill > self.maximum_fill() {
			return Err(StaticError::FillExceedsMaximum {
				new_fill,
				maximum_fill: self.maximum_fill(),
			});
		}
		Ok(new_fill)
	}

	/// Selector-prefixed ABI encoding of these arguments.
	///
	/// Every entry point shares one parameter list, so the layout of `any`
	/// serves all of them.
	pub fn encode_call(&self, selector: FixedBytes<4>) -> Vec<u8> {
		let call = IStaticMarket::anyCall {
			extra: self.extra.clone(),
			addresses: self.addresses,
			howToCalls: [self.how_to_calls[0].to_u8(), self.how_to_calls[1].to_u8()],
			uints: self.uints,
			data: self.data.clone(),
			counterdata: self.counterdata.clone(),
		};
		let mut out = selector.to_vec();
		call.abi_encode_raw(&mut out);
		out
	}

	/// Splits selector-prefixed calldata into the selector and decoded arguments.
	pub fn decode_call(calldata: &[u8]) -> Result<(FixedBytes<4>, Self), StaticError> {
		let selector = calldata::selector_of(calldata)?;
		let call = IStaticMarket::anyCall::abi_decode_raw(&calldata[4..])
			.map_err(|e| StaticError::Decode(format!("invalid predicate arguments: {}", e)))?;

		let decode_kind = |raw: u8| {
			HowToCall::from_u8(raw)
				.ok_or_else(|| StaticError::Decode(format!("unknown call kind {}", raw)))
		};

		Ok((
			selector,
			Self {
				how_to_calls: [decode_kind(call.howToCalls[0])?, decode_kind(call.howToCalls[1])?],
				extra: call.extra,
				addresses: call.addresses,
				uints: call.uints,
				data: call.data,
				counterdata: call.counterdata,
			},
		))
	}
}

/// Signature shared by every predicate.
pub type Predicate = fn(&PredicateArgs) -> Result<U256, StaticError>;

/// Trade shapes supported by the static market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeShape {
	Any,
	AnyAddOne,
	AnyNoFill,
	Erc721ForErc20,
	Erc20ForErc721,
	Erc721ForErc721,
	Erc1155ForErc20,
	Erc20ForErc1155,
	Erc20ForErc20,
	Erc721ForErc20WithFee,
	Erc20WithFeeForErc721,
	Erc721BundleForErc20,
	Erc20ForErc721Bundle,
	LazyMintErc721ForErc20,
	Erc20ForLazyMintErc721,
}

impl TradeShape {
	pub const ALL: [TradeShape; 15] = [
		TradeShape::Any,
		TradeShape::AnyAddOne,
		TradeShape::AnyNoFill,
		TradeShape::Erc721ForErc20,
		TradeShape::Erc20ForErc721,
		TradeShape::Erc721ForErc721,
		TradeShape::Erc1155ForErc20,
		TradeShape::Erc20ForErc1155,
		TradeShape::Erc20ForErc20,
		TradeShape::Erc721ForErc20WithFee,
		TradeShape::Erc20WithFeeForErc721,
		TradeShape::Erc721BundleForErc20,
		TradeShape::Erc20ForErc721Bundle,
		TradeShape::LazyMintErc721ForErc20,
		TradeShape::Erc20ForLazyMintErc721,
	];

	/// The 4-byte selector of the shape's Solidity entry point.
	pub fn selector(self) -> FixedBytes<4> {
		use IStaticMarket::*;
		FixedBytes::from(match self {
			TradeShape::Any => anyCall::SELECTOR,
			TradeShape::AnyAddOne => anyAddOneCall::SELECTOR,
			TradeShape::AnyNoFill => anyNoFillCall::SELECTOR,
			TradeShape::Erc721ForErc20 => ERC721ForERC20Call::SELECTOR,
			TradeShape::Erc20ForErc721 => ERC20ForERC721Call::SELECTOR,
			TradeShape::Erc721ForErc721 => ERC721ForERC721Call::SELECTOR,
			TradeShape::Erc1155ForErc20 => ERC1155ForERC20Call::SELECTOR,
			TradeShape::Erc20ForErc1155 => ERC20ForERC1155Call::SELECTOR,
			TradeShape::Erc20ForErc20 => ERC20ForERC20Call::SELECTOR,
			TradeShape::Erc721ForErc20WithFee => ERC721ForERC20WithFeeCall::SELECTOR,
			TradeShape::Erc20WithFeeForErc721 => ERC20WithFeeForERC721Call::SELECTOR,
			TradeShape::Erc721BundleForErc20 => ERC721BundleForERC20Call::SELECTOR,
			TradeShape::Erc20ForErc721Bundle => ERC20ForERC721BundleCall::SELECTOR,
			TradeShape::LazyMintErc721ForErc20 => LazyMintERC721ForERC20Call::SELECTOR,
			TradeShape::Erc20ForLazyMintErc721 => ERC20ForLazyMintERC721Call::SELECTOR,
		})
	}

	pub fn from_selector(selector: FixedBytes<4>) -> Option<Self> {
		Self::ALL.into_iter().find(|shape| shape.selector() == selector)
	}

	/// The Solidity function name of the shape.
	pub fn name(self) -> &'static str {
		use IStaticMarket::*;
		match self {
			TradeShape::Any => anyCall::SIGNATURE,
			TradeShape::AnyAddOne => anyAddOneCall::SIGNATURE,
			TradeShape::AnyNoFill => anyNoFillCall::SIGNATURE,
			TradeShape::Erc721ForErc20 => ERC721ForERC20Call::SIGNATURE,
			TradeShape::Erc20ForErc721 => ERC20ForERC721Call::SIGNATURE,
			TradeShape::Erc721ForErc721 => ERC721ForERC721Call::SIGNATURE,
			TradeShape::Erc1155ForErc20 => ERC1155ForERC20Call::SIGNATURE,
			TradeShape::Erc20ForErc1155 => ERC20ForERC1155Call::SIGNATURE,
			TradeShape::Erc20ForErc20 => ERC20ForERC20Call::SIGNATURE,
			TradeShape::Erc721ForErc20WithFee => ERC721ForERC20WithFeeCall::SIGNATURE,
			TradeShape::Erc20WithFeeForErc721 => ERC20WithFeeForERC721Call::SIGNATURE,
			TradeShape::Erc721BundleForErc20 => ERC721BundleForERC20Call::SIGNATURE,
			TradeShape::Erc20ForErc721Bundle => ERC20ForERC721BundleCall::SIGNATURE,
			TradeShape::LazyMintErc721ForErc20 => LazyMintERC721ForERC20Call::SIGNATURE,
			TradeShape::Erc20ForLazyMintErc721 => ERC20ForLazyMintERC721Call::SIGNATURE,
		}
		.split('(')
		.next()
		.unwrap_or_default()
	}

	/// The validation function registered for this shape.
	pub fn predicate(self) -> Predicate {
		match self {
			TradeShape::Any => shapes::trivial::any,
			TradeShape::AnyAddOne => shapes::trivial::any_add_one,
			TradeShape::AnyNoFill => shapes::trivial::any_no_fill,
			TradeShape::Erc721ForErc20 => shapes::nft::erc721_for_erc20,
			TradeShape::Erc20ForErc721 => shapes::nft::erc20_for_erc721,
			TradeShape::Erc721ForErc721 => shapes::nft::erc721_for_erc721,
			TradeShape::Erc1155ForErc20 => shapes::fungible::erc1155_for_erc20,
			TradeShape::Erc20ForErc1155 => shapes::fungible::erc20_for_erc1155,
			TradeShape::Erc20ForErc20 => shapes::fungible::erc20_for_erc20,
			TradeShape::Erc721ForErc20WithFee => shapes::bundle::erc721_for_erc20_with_fee,
			TradeShape::Erc20WithFeeForErc721 => shapes::bundle::erc20_with_fee_for_erc721,
			TradeShape::Erc721BundleForErc20 => shapes::bundle::erc721_bundle_for_erc20,
			TradeShape::Erc20ForErc721Bundle => shapes::bundle::erc20_for_erc721_bundle,
			TradeShape::LazyMintErc721ForErc20 => shapes::lazy_mint::lazy_mint_erc721_for_erc20,
			TradeShape::Erc20ForLazyMintErc721 => shapes::lazy_mint::erc20_for_lazy_mint_erc721,
		}
	}

	/// Runs the shape's predicate and returns the new fill.
	pub fn validate(self, args: &PredicateArgs) -> Result<U256, StaticError> {
		(self.predicate())(args)
	}
}

impl fmt::Display for TradeShape {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name())
	}
}

/// Entry point of the static market: decodes selector-prefixed calldata and
/// runs the predicate registered under the selector.
pub fn dispatch(calldata: &[u8]) -> Result<U256, StaticError> {
	let (selector, args) = PredicateArgs::decode_call(calldata)?;
	let shape = TradeShape::from_selector(selector).ok_or(StaticError::UnknownSelector(selector))?;
	let result = shape.validate(&args);
	debug!(shape = %shape, ok = result.is_ok(), "Evaluated static predicate");
	result
}

#[cfg(test)]
pub(crate) mod test_utils {
	use super::*;

	pub fn maker() -> Address {
		Address::repeat_byte(0xaa)
	}

	pub fn taker() -> Address {
		Address::repeat_byte(0xbb)
	}

	pub fn fee_recipient() -> Address {
		Address::repeat_byte(0xfe)
	}

	pub fn direct_calls() -> [HowToCall; 2] {
		[HowToCall::Call, HowToCall::Call]
	}

	/// Builds predicate arguments with the given call targets and kinds.
	pub fn args(
		extra: Vec<u8>,
		targets: [Address; 2],
		how_to_calls: [HowToCall; 2],
		uints: [u64; 3],
		data: Vec<u8>,
		counterdata: Vec<u8>,
	) -> PredicateArgs {
		PredicateArgs {
			extra: extra.into(),
			addresses: [
				Address::repeat_byte(0x01),
				maker(),
				targets[0],
				Address::repeat_byte(0x01),
				taker(),
				targets[1],
				fee_recipient(),
			],
			how_to_calls,
			uints: [U256::from(uints[0]), U256::from(uints[1]), U256::from(uints[2])],
			data: data.into(),
			counterdata: counterdata.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::*;
	use std::collections::HashSet;

	#[test]
	fn test_selectors_are_unique() {
		let selectors: HashSet<_> = TradeShape::ALL.iter().map(|s| s.selector()).collect();
		assert_eq!(selectors.len(), TradeShape::ALL.len());
		for shape in TradeShape::ALL {
			assert_eq!(TradeShape::from_selector(shape.selector()), Some(shape));
		}
	}

	#[test]
	fn test_shape_names() {
		assert_eq!(TradeShape::Erc721ForErc20.name(), "ERC721ForERC20");
		assert_eq!(TradeShape::AnyAddOne.to_string(), "anyAddOne");
	}

	#[test]
	fn test_dispatch_round_trip() {
		let args = args(
			vec![],
			[Address::ZERO, Address::ZERO],
			[HowToCall::Call, HowToCall::DelegateCall],
			[0, 10, 4],
			vec![1, 2, 3],
			vec![],
		);
		let calldata = args.encode_call(TradeShape::AnyAddOne.selector());
		let (selector, decoded) = PredicateArgs::decode_call(&calldata).unwrap();
		assert_eq!(selector, TradeShape::AnyAddOne.selector());
		assert_eq!(decoded, args);
		assert_eq!(dispatch(&calldata).unwrap(), U256::from(5));
	}

	#[test]
	fn test_encoding_matches_solidity_entry_point() {
		let args = args(
			vec![0xab; 3],
			[Address::repeat_byte(1), Address::repeat_byte(2)],
			[HowToCall::Call, HowToCall::DelegateCall],
			[250, 1, 0],
			vec![4, 5],
			vec![6],
		);
		let expected = IStaticMarket::ERC721ForERC20Call {
			extra: args.extra.clone(),
			addresses: args.addresses,
			howToCalls: [0, 1],
			uints: args.uints,
			data: args.data.clone(),
			counterdata: args.counterdata.clone(),
		}
		.abi_encode();

		assert_eq!(args.encode_call(TradeShape::Erc721ForErc20.selector()), expected);
		// Two uint8 words between the address array and the uint256 array.
		assert_eq!(expected.len(), 4 + 32 * (1 + 7 + 2 + 3 + 1 + 1) + 32 * 2 * 3);
	}

	#[test]
	fn test_dispatch_unknown_selector() {
		let args = args(
			vec![],
			[Address::ZERO, Address::ZERO],
			[HowToCall::Call, HowToCall::Call],
			[0, 1, 0],
			vec![],
			vec![],
		);
		let calldata = args.encode_call(FixedBytes::from([0xde, 0xad, 0xbe, 0xef]));
		assert!(matches!(dispatch(&calldata), Err(StaticError::UnknownSelector(_))));
	}
}
