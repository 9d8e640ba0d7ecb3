//! Typed views over raw proxied calldata.
//!
//! Amount extraction reads fixed argument offsets, but only after the
//! function selector has been checked, so a payload with a foreign
//! signature is rejected instead of yielding a word from the wrong
//! argument. Predicates still compare the whole payload against a freshly
//! encoded expected call afterwards.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::SolCall;
use unseen_types::abi::{IAtomicizer, IERC1155, IERC20, IERC721};

use crate::array_utils::{array_drop, array_slice, array_take};
use crate::StaticError;

/// Offset of the amount word in `transferFrom(address,address,uint256)` calldata.
pub const ERC20_AMOUNT_OFFSET: usize = 68;
/// Offset of the amount word in `safeTransferFrom(address,address,uint256,uint256,bytes)` calldata.
pub const ERC1155_AMOUNT_OFFSET: usize = 100;

/// Returns the 4-byte function selector of a payload.
pub fn selector_of(data: &[u8]) -> Result<FixedBytes<4>, StaticError> {
	array_take(data, 4)
		.map(FixedBytes::<4>::from_slice)
		.ok_or_else(|| StaticError::Decode("calldata shorter than a selector".to_string()))
}

fn expect_selector(data: &[u8], expected: [u8; 4]) -> Result<(), StaticError> {
	let found = selector_of(data)?;
	if found != FixedBytes::from(expected) {
		return Err(StaticError::SelectorMismatch {
			expected: FixedBytes::from(expected),
			found,
		});
	}
	Ok(())
}

fn read_word(data: &[u8], offset: usize) -> Result<U256, StaticError> {
	array_slice(data, offset, 32)
		.map(U256::from_be_slice)
		.ok_or_else(|| StaticError::Decode(format!("no 32-byte word at offset {}", offset)))
}

/// Amount argument of an ERC20 `transferFrom` payload.
pub fn erc20_amount(data: &[u8]) -> Result<U256, StaticError> {
	expect_selector(data, IERC20::transferFromCall::SELECTOR)?;
	read_word(data, ERC20_AMOUNT_OFFSET)
}

/// Amount argument of an ERC1155 `safeTransferFrom` payload.
pub fn erc1155_amount(data: &[u8]) -> Result<U256, StaticError> {
	expect_selector(data, IERC1155::safeTransferFromCall::SELECTOR)?;
	read_word(data, ERC1155_AMOUNT_OFFSET)
}

pub fn erc20_transfer_from(from: Address, to: Address, amount: U256) -> Vec<u8> {
	IERC20::transferFromCall { from, to, amount }.abi_encode()
}

pub fn erc721_transfer_from(from: Address, to: Address, token_id: U256) -> Vec<u8> {
	IERC721::transferFromCall {
		from,
		to,
		tokenId: token_id,
	}
	.abi_encode()
}

pub fn erc721_mint(to: Address, token_id: U256) -> Vec<u8> {
	IERC721::mintCall { to, tokenId: token_id }.abi_encode()
}

pub fn erc1155_safe_transfer_from(from: Address, to: Address, id: U256, amount: U256) -> Vec<u8> {
	IERC1155::safeTransferFromCall {
		from,
		to,
		id,
		amount,
		data: Bytes::new(),
	}
	.abi_encode()
}

/// One entry of an atomicized bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledCall {
	pub target: Address,
	pub value: U256,
	pub data: Bytes,
}

impl BundledCall {
	pub fn new(target: Address, data: impl Into<Bytes>) -> Self {
		Self {
			target,
			value: U256::ZERO,
			data: data.into(),
		}
	}
}

/// Encodes calls into a single `atomicize` payload.
pub fn encode_atomicized(calls: &[BundledCall]) -> Vec<u8> {
	let mut calldatas = Vec::new();
	for call in calls {
		calldatas.extend_from_slice(&call.data);
	}

	IAtomicizer::atomicizeCall {
		addrs: calls.iter().map(|c| c.target).collect(),
		values: calls.iter().map(|c| c.value).collect(),
		calldataLengths: calls.iter().map(|c| U256::from(c.data.len())).collect(),
		calldatas: calldatas.into(),
	}
	.abi_encode()
}

/// Splits an `atomicize` payload back into its individual calls.
pub fn decode_atomicized(data: &[u8]) -> Result<Vec<BundledCall>, StaticError> {
	let call = IAtomicizer::atomicizeCall::abi_decode(data)
		.map_err(|e| StaticError::Decode(format!("invalid atomicize payload: {}", e)))?;

	if call.addrs.len() != call.values.len() || call.addrs.len() != call.calldataLengths.len() {
		return Err(StaticError::InvalidBundle(
			"array lengths differ".to_string(),
		));
	}

	let mut remaining: &[u8] = &call.calldatas;
	let mut calls = Vec::with_capacity(call.addrs.len());
	for ((target, value), length) in call
		.addrs
		.iter()
		.zip(call.values.iter())
		.zip(call.calldataLengths.iter())
	{
		if *length > U256::from(remaining.len()) {
			return Err(StaticError::InvalidBundle(
				"calldata lengths exceed packed calldata".to_string(),
			));
		}
		let length = length.to::<usize>();
		let (chunk, rest) = match (array_take(remaining, length), array_drop(remaining, length)) {
			(Some(chunk), Some(rest)) => (chunk, rest),
			_ => {
				return Err(StaticError::InvalidBundle(
					"calldata lengths exceed packed calldata".to_string(),
				))
			}
		};
		calls.push(BundledCall {
			target: *target,
			value: *value,
			data: Bytes::copy_from_slice(chunk),
		});
		remaining = rest;
	}

	if !remaining.is_empty() {
		return Err(StaticError::InvalidBundle(
			"trailing packed calldata".to_string(),
		));
	}

	Ok(calls)
}
