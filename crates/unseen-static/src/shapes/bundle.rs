//! Trades where one side is an atomicized bundle of calls, executed by
//! delegate-calling the atomicizer from the maker's proxy.

use alloy_primitives::{Address, U256};
use unseen_types::HowToCall;

use crate::calldata::{decode_atomicized, erc20_amount, erc20_transfer_from, erc721_transfer_from};
use crate::extra::{decode_bundle, decode_fee_trade, BundleTerms};
use crate::{CallSide, PredicateArgs, StaticError, INVERSE_BASIS_POINT};

/// Splits `price` into the seller's share and the protocol fee.
pub fn split_fee(price: U256, protocol_fee_bps: U256) -> Result<(U256, U256), StaticError> {
	let fee = price
		.checked_mul(protocol_fee_bps)
		.ok_or(StaticError::Overflow)?
		/ U256::from(INVERSE_BASIS_POINT);
	let share = price.checked_sub(fee).ok_or(StaticError::Overflow)?;
	Ok((share, fee))
}

/// Checks an atomicized ERC20 payment of `price` from `payer`: the seller's
/// share first, then the protocol fee to the fee recipient when non-zero.
fn check_fee_payment(
	args: &PredicateArgs,
	side: CallSide,
	erc20: Address,
	payer: Address,
	seller: Address,
	price: U256,
) -> Result<(), StaticError> {
	let payload = match side {
		CallSide::Call => &args.data,
		CallSide::Countercall => &args.counterdata,
	};
	let calls = decode_atomicized(payload)?;
	let (share, fee) = split_fee(price, args.protocol_fee_bps())?;

	let mut expected = vec![erc20_transfer_from(payer, seller, share)];
	if !fee.is_zero() {
		expected.push(erc20_transfer_from(payer, args.fee_recipient(), fee));
	}
	if calls.len() != expected.len() {
		return Err(StaticError::InvalidBundle(format!(
			"expected {} payment calls, found {}",
			expected.len(),
			calls.len()
		)));
	}

	if let Some(fee_call) = calls.get(1) {
		let actual = erc20_amount(&fee_call.data)?;
		if actual != fee {
			return Err(StaticError::FeeMismatch {
				expected: fee,
				actual,
			});
		}
	}

	for (call, expected) in calls.iter().zip(expected.iter()) {
		if call.target != erc20 {
			return Err(StaticError::TargetMismatch(side));
		}
		if !call.value.is_zero() {
			return Err(StaticError::InvalidBundle("payment calls carry no value".to_string()));
		}
		if !crate::array_utils::array_eq(&call.data, expected) {
			return Err(StaticError::CalldataMismatch(side));
		}
	}
	Ok(())
}

/// Checks an atomicized list of ERC721 transfers from `from` to `to`.
fn check_nft_bundle(
	args: &PredicateArgs,
	side: CallSide,
	terms: &BundleTerms,
	from: Address,
	to: Address,
) -> Result<(), StaticError> {
	let payload = match side {
		CallSide::Call => &args.data,
		CallSide::Countercall => &args.counterdata,
	};
	let calls = decode_atomicized(payload)?;
	if calls.len() != terms.tokens.len() {
		return Err(StaticError::InvalidBundle(format!(
			"expected {} transfers, found {}",
			terms.tokens.len(),
			calls.len()
		)));
	}

	for ((call, token), token_id) in calls.iter().zip(&terms.tokens).zip(&terms.token_ids) {
		if call.target != *token {
			return Err(StaticError::TargetMismatch(side));
		}
		if !call.value.is_zero() {
			return Err(StaticError::InvalidBundle("transfer calls carry no value".to_string()));
		}
		if !crate::array_utils::array_eq(&call.data, &erc721_transfer_from(from, to, *token_id)) {
			return Err(StaticError::CalldataMismatch(side));
		}
	}
	Ok(())
}

/// Sell one ERC721; the buyer pays the price through the atomicizer, split
/// between the seller and the protocol fee recipient.
///
/// `extra = ([erc721, erc20, atomicizer], [tokenId, price])`.
pub fn erc721_for_erc20_with_fee(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::DelegateCall)?;
	let ([erc721, erc20, atomicizer], [token_id, price]) = decode_fee_trade(&args.extra)?;
	if price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, erc721)?;
	args.require_target(CallSide::Countercall, atomicizer)?;
	args.require_calldata(
		CallSide::Call,
		&erc721_transfer_from(args.maker(), args.counter_maker(), token_id),
	)?;
	check_fee_payment(
		args,
		CallSide::Countercall,
		erc20,
		args.counter_maker(),
		args.maker(),
		price,
	)?;

	args.next_fill(U256::from(1))
}

/// Buy one ERC721, paying the seller's share and the protocol fee in one
/// atomicized call.
///
/// `extra = ([erc20, erc721, atomicizer], [tokenId, price])`.
pub fn erc20_with_fee_for_erc721(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::DelegateCall, HowToCall::Call)?;
	let ([erc20, erc721, atomicizer], [token_id, price]) = decode_fee_trade(&args.extra)?;
	if price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, atomicizer)?;
	args.require_target(CallSide::Countercall, erc721)?;
	check_fee_payment(
		args,
		CallSide::Call,
		erc20,
		args.maker(),
		args.counter_maker(),
		price,
	)?;
	args.require_calldata(
		CallSide::Countercall,
		&erc721_transfer_from(args.counter_maker(), args.maker(), token_id),
	)?;

	args.next_fill(U256::from(1))
}

/// Sell several ERC721s at once for a single ERC20 price.
///
/// `extra = (atomicizer, tokens[], tokenIds[], erc20, price)`.
pub fn erc721_bundle_for_erc20(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::DelegateCall, HowToCall::Call)?;
	let terms = decode_bundle(&args.extra)?;
	if terms.price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, terms.atomicizer)?;
	args.require_target(CallSide::Countercall, terms.erc20)?;
	check_nft_bundle(args, CallSide::Call, &terms, args.maker(), args.counter_maker())?;
	args.require_calldata(
		CallSide::Countercall,
		&erc20_transfer_from(args.counter_maker(), args.maker(), terms.price),
	)?;

	args.next_fill(U256::from(1))
}

/// Buy several ERC721s at once for a single ERC20 price.
///
/// `extra = (atomicizer, tokens[], tokenIds[], erc20, price)`.
pub fn erc20_for_erc721_bundle(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::DelegateCall)?;
	let terms = decode_bundle(&args.extra)?;
	if terms.price.is_zero() {
		return Err(StaticError::ZeroTerm("price"));
	}

	args.require_target(CallSide::Call, terms.erc20)?;
	args.require_target(CallSide::Countercall, terms.atomicizer)?;
	args.require_calldata(
		CallSide::Call,
		&erc20_transfer_from(args.maker(), args.counter_maker(), terms.price),
	)?;
	check_nft_bundle(args, CallSide::Countercall, &terms, args.counter_maker(), args.maker())?;

	args.next_fill(U256::from(1))
}
