//! Trades where the ERC721 side is minted on delivery instead of transferred.

use alloy_primitives::U256;
use unseen_types::HowToCall;

use crate::calldata::{erc20_transfer_from, erc721_mint};
use crate::extra::decode_pair;
use crate::{CallSide, PredicateArgs, StaticError};

/// The maker mints a token straight to the buyer in exchange for ERC20.
///
/// `extra = ([erc721, erc20], [tokenId, price])`.
pub fn lazy_mint_erc721_for_erc20(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([erc721, erc20], [token_id, price]) = decode_pair(&args.extra)?;
	if price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, erc721)?;
	args.require_target(CallSide::Countercall, erc20)?;
	args.require_calldata(CallSide::Call, &erc721_mint(args.counter_maker(), token_id))?;
	args.require_calldata(
		CallSide::Countercall,
		&erc20_transfer_from(args.counter_maker(), args.maker(), price),
	)?;

	args.next_fill(U256::from(1))
}

/// The buyer pays ERC20 and the counterparty mints the token to them.
///
/// `extra = ([erc20, erc721], [tokenId, price])`.
pub fn erc20_for_lazy_mint_erc721(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([erc20, erc721], [token_id, price]) = decode_pair(&args.extra)?;
	if price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, erc20)?;
	args.require_target(CallSide::Countercall, erc721)?;
	args.require_calldata(
		CallSide::Call,
		&erc20_transfer_from(args.maker(), args.counter_maker(), price),
	)?;
	args.require_calldata(CallSide::Countercall, &erc721_mint(args.maker(), token_id))?;

	args.next_fill(U256::from(1))
}
