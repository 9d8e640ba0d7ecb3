//! Encoders and decoders for the `staticExtradata` layouts of each trade shape.
//!
//! Layouts are plain ABI parameter lists, so orders built here interoperate
//! with `abi.encode(...)` on the contract side.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;

use crate::StaticError;

type Pair = ([Address; 2], [U256; 2]);
type PairWithRatio = ([Address; 2], [U256; 3]);
type FeeTrade = ([Address; 3], [U256; 2]);
type Bundle = (Address, Vec<Address>, Vec<U256>, Address, U256);

fn decode_error(layout: &str, e: alloy_sol_types::Error) -> StaticError {
	StaticError::Decode(format!("extra data is not a valid {} layout: {}", layout, e))
}

/// Two tokens and two terms, e.g. `[nft, erc20]` with `[tokenId, price]`,
/// or `[erc20Give, erc20Get]` with `[numerator, denominator]`.
pub fn encode_pair(tokens: [Address; 2], terms: [U256; 2]) -> Bytes {
	(tokens, terms).abi_encode_params().into()
}

pub(crate) fn decode_pair(extra: &[u8]) -> Result<Pair, StaticError> {
	Pair::abi_decode_params(extra).map_err(|e| decode_error("token pair", e))
}

/// `[erc1155, erc20]` (or reversed) with `[tokenId, numerator, denominator]`.
pub fn encode_pair_with_ratio(tokens: [Address; 2], id: U256, numerator: U256, denominator: U256) -> Bytes {
	(tokens, [id, numerator, denominator]).abi_encode_params().into()
}

pub(crate) fn decode_pair_with_ratio(extra: &[u8]) -> Result<PairWithRatio, StaticError> {
	PairWithRatio::abi_decode_params(extra).map_err(|e| decode_error("token pair with ratio", e))
}

/// `[nft, erc20, atomicizer]` (token order follows the shape) with `[tokenId, price]`.
pub fn encode_fee_trade(tokens: [Address; 3], token_id: U256, price: U256) -> Bytes {
	(tokens, [token_id, price]).abi_encode_params().into()
}

pub(crate) fn decode_fee_trade(extra: &[u8]) -> Result<FeeTrade, StaticError> {
	FeeTrade::abi_decode_params(extra).map_err(|e| decode_error("fee trade", e))
}

/// Configuration of a bundle trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTerms {
	pub atomicizer: Address,
	pub tokens: Vec<Address>,
	pub token_ids: Vec<U256>,
	pub erc20: Address,
	pub price: U256,
}

pub fn encode_bundle(terms: &BundleTerms) -> Bytes {
	(
		terms.atomicizer,
		terms.tokens.clone(),
		terms.token_ids.clone(),
		terms.erc20,
		terms.price,
	)
		.abi_encode_params()
		.into()
}

pub(crate) fn decode_bundle(extra: &[u8]) -> Result<BundleTerms, StaticError> {
	let (atomicizer, tokens, token_ids, erc20, price) =
		Bundle::abi_decode_params(extra).map_err(|e| decode_error("bundle", e))?;
	if tokens.is_empty() || tokens.len() != token_ids.len() {
		return Err(StaticError::InvalidBundle(format!(
			"{} tokens configured with {} ids",
			tokens.len(),
			token_ids.len()
		)));
	}
	Ok(BundleTerms {
		atomicizer,
		tokens,
		token_ids,
		erc20,
		price,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bundle_requires_matching_ids() {
		let terms = BundleTerms {
			atomicizer: Address::repeat_byte(9),
			tokens: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
			token_ids: vec![U256::from(1)],
			erc20: Address::repeat_byte(3),
			price: U256::from(10),
		};
		assert!(matches!(
			decode_bundle(&encode_bundle(&terms)),
			Err(StaticError::InvalidBundle(_))
		));
	}

	#[test]
	fn test_wrong_layout_is_a_decode_error() {
		assert!(matches!(decode_pair(&[1, 2, 3]), Err(StaticError::Decode(_))));
		assert!(matches!(decode_bundle(&[]), Err(StaticError::Decode(_))));
	}
}
