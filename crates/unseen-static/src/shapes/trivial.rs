//! Predicates that accept any pair of calls.

use alloy_primitives::U256;

use crate::{PredicateArgs, StaticError};

pub fn any(_args: &PredicateArgs) -> Result<U256, StaticError> {
	Ok(U256::from(1))
}

/// Accepts anything and counts one more fill, up to the order's maximum.
pub fn any_add_one(args: &PredicateArgs) -> Result<U256, StaticError> {
	args.next_fill(U256::from(1))
}

pub fn any_no_fill(_args: &PredicateArgs) -> Result<U256, StaticError> {
	Ok(U256::ZERO)
}
