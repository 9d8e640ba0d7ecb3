//! Single ERC721 trades, all-or-nothing.

use alloy_primitives::U256;
use unseen_types::HowToCall;

use crate::calldata::{erc20_transfer_from, erc721_transfer_from};
use crate::extra::decode_pair;
use crate::{CallSide, PredicateArgs, StaticError};

/// Sell one ERC721 for a fixed ERC20 price.
///
/// `extra = ([erc721, erc20], [tokenId, price])`.
pub fn erc721_for_erc20(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([erc721, erc20], [token_id, price]) = decode_pair(&args.extra)?;
	if price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, erc721)?;
	args.require_target(CallSide::Countercall, erc20)?;
	args.require_calldata(
		CallSide::Call,
		&erc721_transfer_from(args.maker(), args.counter_maker(), token_id),
	)?;
	args.require_calldata(
		CallSide::Countercall,
		&erc20_transfer_from(args.counter_maker(), args.maker(), price),
	)?;

	args.next_fill(U256::from(1))
}

/// Buy one ERC721 for a fixed ERC20 price.
///
/// `extra = ([erc20, erc721], [tokenId, price])`.
pub fn erc20_for_erc721(args: &PredicateArgs) -> Result<U256, StaticError> {
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
	args.require_calldata(
		CallSide::Countercall,
		&erc721_transfer_from(args.counter_maker(), args.maker(), token_id),
	)?;

	args.next_fill(U256::from(1))
}

/// Swap one ERC721 for another.
///
/// `extra = ([giveToken, getToken], [giveId, getId])`.
pub fn erc721_for_erc721(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([give_token, get_token], [give_id, get_id]) = decode_pair(&args.extra)?;

	args.require_target(CallSide::Call, give_token)?;
	args.require_target(CallSide::Countercall, get_token)?;
	args.require_calldata(
		CallSide::Call,
		&erc721_transfer_from(args.maker(), args.counter_maker(), give_id),
	)?;
	args.require_calldata(
		CallSide::Countercall,
		&erc721_transfer_from(args.counter_maker(), args.maker(), get_id),
	)?;

	args.next_fill(U256::from(1))
}
