//! Smart-contract wallets that validate signatures on behalf of an owner key.

use alloy_primitives::{Address, Bytes, FixedBytes, B256};
use alloy_sol_types::{SolCall, SolValue};
use unseen_types::abi::{IERC1271, IERC1271Legacy};

use crate::error::CallError;
use crate::signature;
use crate::world::{Code, Frame, World};

/// Which signature-validation interface a wallet speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
	/// `isValidSignature(bytes32,bytes,bytes)`.
	CalldataAware,
	/// `isValidSignature(bytes,bytes)`.
	Legacy,
}

#[derive(Debug, Clone)]
pub struct WalletState {
	pub owner: Address,
	pub kind: WalletKind,
}

/// Magic value returned by the calldata-aware interface on success.
pub fn calldata_aware_magic() -> FixedBytes<4> {
	FixedBytes::from(IERC1271::isValidSignatureCall::SELECTOR)
}

/// Magic value returned by the legacy interface on success (`0x20c13b0b`).
pub fn legacy_magic() -> FixedBytes<4> {
	FixedBytes::from(IERC1271Legacy::isValidSignatureCall::SELECTOR)
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let wallet = world.state::<WalletState>(frame.address)?.clone();
	let selector = data.get(..4).unwrap_or_default();

	let magic = match wallet.kind {
		WalletKind::CalldataAware if selector == &IERC1271::isValidSignatureCall::SELECTOR[..] => {
			let call = IERC1271::isValidSignatureCall::abi_decode(data)
				.map_err(|e| CallError::InvalidCalldata(e.to_string()))?;
			if signature::recover(call.hash, &call.signature) == Some(wallet.owner) {
				calldata_aware_magic()
			} else {
				FixedBytes::ZERO
			}
		}
		WalletKind::Legacy if selector == &IERC1271Legacy::isValidSignatureCall::SELECTOR[..] => {
			let call = IERC1271Legacy::isValidSignatureCall::abi_decode(data)
				.map_err(|e| CallError::InvalidCalldata(e.to_string()))?;
			let hash = match call.data.len() {
				32 => B256::from_slice(&call.data),
				_ => return Ok(FixedBytes::<4>::ZERO.abi_encode().into()),
			};
			if signature::recover(hash, &call.signature) == Some(wallet.owner) {
				legacy_magic()
			} else {
				FixedBytes::ZERO
			}
		}
		_ => {
			return Err(CallError::Revert(format!(
				"wallet does not implement selector 0x{}",
				alloy_primitives::hex::encode(selector)
			)))
		}
	};

	Ok(magic.abi_encode().into())
}

pub fn deploy(world: &mut World, deployer: Address, owner: Address, kind: WalletKind) -> Result<Address, CallError> {
	world.deploy(deployer, Code::Wallet(WalletState { owner, kind }))
}
