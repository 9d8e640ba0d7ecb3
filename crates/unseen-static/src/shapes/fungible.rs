//! Partially fillable trades priced by a numerator/denominator ratio.
//!
//! The fill of each order counts the units the order's maker gave away.
//! Ratios are compared by cross-multiplication:
//! `numerator * counterAmount == denominator * amount`.

use alloy_primitives::U256;
use unseen_types::HowToCall;

use crate::calldata::{erc1155_amount, erc1155_safe_transfer_from, erc20_amount, erc20_transfer_from};
use crate::extra::{decode_pair, decode_pair_with_ratio};
use crate::{CallSide, PredicateArgs, StaticError};

fn check_ratio(
	numerator: U256,
	denominator: U256,
	amount: U256,
	counter_amount: U256,
) -> Result<(), StaticError> {
	if numerator.is_zero() {
		return Err(StaticError::ZeroTerm("numerator"));
	}
	if denominator.is_zero() {
		return Err(StaticError::ZeroTerm("denominator"));
	}
	if amount.is_zero() {
		return Err(StaticError::ZeroTerm("amount"));
	}

	let lhs = numerator
		.checked_mul(counter_amount)
		.ok_or(StaticError::Overflow)?;
	let rhs = denominator.checked_mul(amount).ok_or(StaticError::Overflow)?;
	if lhs != rhs {
		return Err(StaticError::WrongRatio);
	}
	Ok(())
}

/// Sell ERC1155 units for ERC20.
///
/// `extra = ([erc1155, erc20], [tokenId, numerator, denominator])`.
pub fn erc1155_for_erc20(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([erc1155, erc20], [token_id, numerator, denominator]) =
		decode_pair_with_ratio(&args.extra)?;

	args.require_target(CallSide::Call, erc1155)?;
	args.require_target(CallSide::Countercall, erc20)?;

	let amount = erc1155_amount(&args.data)?;
	let counter_amount = erc20_amount(&args.counterdata)?;
	check_ratio(numerator, denominator, amount, counter_amount)?;

	args.require_calldata(
		CallSide::Call,
		&erc1155_safe_transfer_from(args.maker(), args.counter_maker(), token_id, amount),
	)?;
	args.require_calldata(
		CallSide::Countercall,
		&erc20_transfer_from(args.counter_maker(), args.maker(), counter_amount),
	)?;

	args.next_fill(amount)
}

/// Buy ERC1155 units with ERC20.
///
/// `extra = ([erc20, erc1155], [tokenId, numerator, denominator])`.
pub fn erc20_for_erc1155(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([erc20, erc1155], [token_id, numerator, denominator]) =
		decode_pair_with_ratio(&args.extra)?;

	args.require_target(CallSide::Call, erc20)?;
	args.require_target(CallSide::Countercall, erc1155)?;

	let amount = erc20_amount(&args.data)?;
	let counter_amount = erc1155_amount(&args.counterdata)?;
	check_ratio(numerator, denominator, amount, counter_amount)?;

	args.require_calldata(
		CallSide::Call,
		&erc20_transfer_from(args.maker(), args.counter_maker(), amount),
	)?;
	args.require_calldata(
		CallSide::Countercall,
		&erc1155_safe_transfer_from(args.counter_maker(), args.maker(), token_id, counter_amount),
	)?;

	args.next_fill(amount)
}

/// Swap one ERC20 for another.
///
/// `extra = ([giveToken, getToken], [numerator, denominator])`.
pub fn erc20_for_erc20(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.require_call_kinds(HowToCall::Call, HowToCall::Call)?;
	let ([give_token, get_token], [numerator, denominator]) = decode_pair(&args.extra)?;

	args.require_target(CallSide::Call, give_token)?;
	args.require_target(CallSide::Countercall, get_token)?;

	let amount = erc20_amount(&args.data)?;
	let counter_amount = erc20_amount(&args.counterdata)?;
	check_ratio(numerator, denominator, amount, counter_amount)?;

	args.require_calldata(
		CallSide::Call,
		&erc20_transfer_from(args.maker(), args.counter_maker(), amount),
	)?;
	args.require_calldata(
		CallSide::Countercall,
		&erc20_transfer_from(args.counter_maker(), args.maker(), counter_amount),
	)?;

	args.next_fill(amount)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::calldata::erc721_mint;
	use crate::extra::{encode_pair, encode_pair_with_ratio};
	use crate::test_utils::*;
	use alloy_primitives::Address;

	fn give() -> Address {
		Address::repeat_byte(0x01)
	}

	fn get() -> Address {
		Address::repeat_byte(0x02)
	}

	fn multi() -> Address {
		Address::repeat_byte(0x15)
	}

	/// Two units of `give` for every three of `get`.
	fn swap_args(amount: u64, counter_amount: u64, previous_fill: u64) -> PredicateArgs {
		args(
			encode_pair([give(), get()], [U256::from(2), U256::from(3)]).to_vec(),
			[give(), get()],
			direct_calls(),
			[0, 1_000, previous_fill],
			erc20_transfer_from(maker(), taker(), U256::from(amount)),
			erc20_transfer_from(taker(), maker(), U256::from(counter_amount)),
		)
	}

	#[test]
	fn test_erc20_for_erc20_ratio_accepted() {
		// 2 * 30 == 3 * 20
		assert_eq!(erc20_for_erc20(&swap_args(20, 30, 0)).unwrap(), U256::from(20));
		assert_eq!(erc20_for_erc20(&swap_args(20, 30, 100)).unwrap(), U256::from(120));
	}

	#[test]
	fn test_erc20_for_erc20_perturbed_amounts_rejected() {
		assert_eq!(erc20_for_erc20(&swap_args(21, 30, 0)), Err(StaticError::WrongRatio));
		assert_eq!(erc20_for_erc20(&swap_args(19, 30, 0)), Err(StaticError::WrongRatio));
		assert_eq!(erc20_for_erc20(&swap_args(20, 31, 0)), Err(StaticError::WrongRatio));
		assert_eq!(erc20_for_erc20(&swap_args(20, 29, 0)), Err(StaticError::WrongRatio));
	}

	#[test]
	fn test_erc20_for_erc20_fill_ceiling() {
		assert_eq!(erc20_for_erc20(&swap_args(20, 30, 980)).unwrap(), U256::from(1_000));
		assert!(matches!(
			erc20_for_erc20(&swap_args(20, 30, 990)),
			Err(StaticError::FillExceedsMaximum { .. })
		));
	}

	#[test]
	fn test_erc20_for_erc20_zero_terms() {
		let mut zero = swap_args(20, 30, 0);
		zero.extra = encode_pair([give(), get()], [U256::ZERO, U256::from(3)]);
		assert_eq!(erc20_for_erc20(&zero), Err(StaticError::ZeroTerm("numerator")));
		assert_eq!(erc20_for_erc20(&swap_args(0, 0, 0)), Err(StaticError::ZeroTerm("amount")));
	}

	#[test]
	fn test_foreign_selector_rejected_before_offset_read() {
		let mut disguised = swap_args(20, 30, 0);
		disguised.counterdata = erc721_mint(maker(), U256::from(30)).into();
		assert!(matches!(
			erc20_for_erc20(&disguised),
			Err(StaticError::SelectorMismatch { .. })
		));
	}

	#[test]
	fn test_erc20_for_erc20_rejects_redirected_payment() {
		let mut redirected = swap_args(20, 30, 0);
		redirected.counterdata =
			erc20_transfer_from(taker(), Address::repeat_byte(0x66), U256::from(30)).into();
		assert_eq!(
			erc20_for_erc20(&redirected),
			Err(StaticError::CalldataMismatch(CallSide::Countercall))
		);
	}

	fn sell_1155_args(units: u64, paid: u64) -> PredicateArgs {
		// One unit of token 7 for every 25 units of ERC20: 1 * paid == 25 * units.
		args(
			encode_pair_with_ratio([multi(), get()], U256::from(7), U256::from(1), U256::from(25))
				.to_vec(),
			[multi(), get()],
			direct_calls(),
			[0, 10, 3],
			erc1155_safe_transfer_from(maker(), taker(), U256::from(7), U256::from(units)),
			erc20_transfer_from(taker(), maker(), U256::from(paid)),
		)
	}

	#[test]
	fn test_erc1155_for_erc20() {
		assert_eq!(erc1155_for_erc20(&sell_1155_args(4, 100)).unwrap(), U256::from(7));
		assert_eq!(erc1155_for_erc20(&sell_1155_args(4, 101)), Err(StaticError::WrongRatio));
		assert_eq!(erc1155_for_erc20(&sell_1155_args(5, 100)), Err(StaticError::WrongRatio));
		assert!(matches!(
			erc1155_for_erc20(&sell_1155_args(8, 200)),
			Err(StaticError::FillExceedsMaximum { .. })
		));
	}

	#[test]
	fn test_erc1155_for_erc20_wrong_token_id() {
		let mut wrong_id = sell_1155_args(4, 100);
		wrong_id.data =
			erc1155_safe_transfer_from(maker(), taker(), U256::from(8), U256::from(4)).into();
		assert_eq!(
			erc1155_for_erc20(&wrong_id),
			Err(StaticError::CalldataMismatch(CallSide::Call))
		);
	}

	#[test]
	fn test_erc20_for_erc1155() {
		// 25 * units == 1 * paid
		let buy = |paid: u64, units: u64| {
			args(
				encode_pair_with_ratio([get(), multi()], U256::from(7), U256::from(25), U256::from(1))
					.to_vec(),
				[get(), multi()],
				direct_calls(),
				[0, 1_000, 0],
				erc20_transfer_from(maker(), taker(), U256::from(paid)),
				erc1155_safe_transfer_from(taker(), maker(), U256::from(7), U256::from(units)),
			)
		};
		assert_eq!(erc20_for_erc1155(&buy(100, 4)).unwrap(), U256::from(100));
		assert_eq!(erc20_for_erc1155(&buy(99, 4)), Err(StaticError::WrongRatio));
		assert_eq!(erc20_for_erc1155(&buy(100, 3)), Err(StaticError::WrongRatio));
	}
}
