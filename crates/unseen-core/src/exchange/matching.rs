//! Atomic matching of two orders.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use unseen_static::PredicateArgs;
use unseen_types::abi::{IAuthenticatedProxy, IProxyRegistry};
use unseen_types::{Call, Event, Order, OrderSide};

use super::authorization::{self, AuthorizationRequest};
use super::{hashing, ExchangeError, ExchangeState, ParameterError};
use crate::error::CallError;
use crate::world::{Frame, World};

/// One side of a match: the order, the call to run for it, and its signature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
	pub order: Order,
	pub call: Call,
	/// Empty when the order is authorized another way.
	#[serde(default)]
	pub signature: Bytes,
}

impl OrderSubmission {
	pub fn new(order: Order, call: Call, signature: impl Into<Bytes>) -> Self {
		Self {
			order,
			call,
			signature: signature.into(),
		}
	}
}

pub(crate) fn parameter_error(
	world: &World,
	exchange: Address,
	order: &Order,
	hash: B256,
) -> Result<Option<ParameterError>, CallError> {
	let now = world.timestamp();

	let listing_time = order.listing_time();
	if listing_time > now {
		return Ok(Some(ParameterError::NotYetListed { listing_time }));
	}

	let expiration_time = order.expiration_time();
	if expiration_time != 0 && expiration_time <= now {
		return Ok(Some(ParameterError::Expired { expiration_time }));
	}

	let fill = world.state::<ExchangeState>(exchange)?.ledger.fill(order.maker, hash);
	if fill >= order.maximum_fill {
		return Ok(Some(ParameterError::AlreadyFilled));
	}

	if !world.has_code(order.static_target) {
		return Ok(Some(ParameterError::StaticTargetMissing));
	}

	Ok(None)
}

fn check_parameters(world: &World, exchange: Address, side: OrderSide, order: &Order, hash: B256) -> Result<(), ExchangeError> {
	match parameter_error(world, exchange, order, hash)? {
		Some(reason) => Err(ExchangeError::InvalidParameters { side, reason }),
		None => Ok(()),
	}
}

fn check_authorization(
	world: &mut World,
	frame: &Frame,
	side: OrderSide,
	submission: &OrderSubmission,
	hash: B256,
) -> Result<(), ExchangeError> {
	let request = AuthorizationRequest {
		exchange: frame.address,
		sender: frame.caller,
		order: &submission.order,
		hash,
		signature: &submission.signature,
		calldata: &submission.call.data,
	};
	if !authorization::authorize(world, &request)? {
		return Err(ExchangeError::Unauthorized { side });
	}
	Ok(())
}

fn decode_address(ret: &[u8]) -> Result<Address, CallError> {
	Address::abi_decode(ret).map_err(|e| CallError::InvalidCalldata(e.to_string()))
}

fn decode_bool(ret: &[u8]) -> Result<bool, CallError> {
	bool::abi_decode(ret).map_err(|e| CallError::InvalidCalldata(e.to_string()))
}

/// Runs `call` through the proxy of `order.executer` in `order.registry`.
fn execute_call(world: &mut World, exchange: Address, side: OrderSide, order: &Order, call: &Call) -> Result<(), ExchangeError> {
	let registry = order.registry;
	if !world.state::<ExchangeState>(exchange)?.is_trusted_registry(registry) {
		return Err(ExchangeError::UntrustedRegistry { side, registry });
	}
	if !world.has_code(call.target) {
		return Err(ExchangeError::TargetHasNoCode {
			side,
			target: call.target,
		});
	}

	let failed = |source: CallError| ExchangeError::CallFailed { side, source };

	let query = IProxyRegistry::proxiesCall {
		user: order.executer,
	}
	.abi_encode();
	let ret = world.static_call(exchange, registry, &query).map_err(failed)?;
	let proxy = decode_address(&ret).map_err(failed)?;
	if proxy == Address::ZERO {
		return Err(ExchangeError::ProxyMissing {
			side,
			user: order.executer,
		});
	}

	let ret = world
		.static_call(exchange, proxy, &IAuthenticatedProxy::implementationCall {}.abi_encode())
		.map_err(failed)?;
	let implementation = decode_address(&ret).map_err(failed)?;
	let ret = world
		.static_call(exchange, registry, &IProxyRegistry::delegateProxyImplementationCall {}.abi_encode())
		.map_err(failed)?;
	if implementation != decode_address(&ret).map_err(failed)? {
		return Err(ExchangeError::StaleProxyImplementation { side, proxy });
	}

	let proxied = IAuthenticatedProxy::proxyCall {
		dest: call.target,
		howToCall: call.how_to_call.to_u8(),
		data: call.data.clone(),
	}
	.abi_encode();
	let ret = world.call(exchange, proxy, &proxied).map_err(failed)?;
	if !decode_bool(&ret).map_err(failed)? {
		return Err(ExchangeError::ProxiedCallReverted { side });
	}

	debug!(%side, %proxy, target = %call.target, how_to_call = ?call.how_to_call, "Executed proxied call");
	Ok(())
}

/// Protocol fee terms handed to every predicate.
#[derive(Debug, Clone, Copy)]
struct FeeTerms {
	bps: U256,
	recipient: Address,
}

/// Asks `own.order`'s static predicate for the order's new fill.
fn static_fill(
	world: &mut World,
	exchange: Address,
	side: OrderSide,
	own: &OrderSubmission,
	counter: &OrderSubmission,
	fee: FeeTerms,
	previous_fill: U256,
) -> Result<U256, ExchangeError> {
	let args = PredicateArgs {
		extra: own.order.static_extradata.clone(),
		addresses: [
			own.order.registry,
			own.order.maker,
			own.call.target,
			counter.order.registry,
			counter.order.maker,
			counter.call.target,
			fee.recipient,
		],
		how_to_calls: [own.call.how_to_call, counter.call.how_to_call],
		uints: [fee.bps, own.order.maximum_fill, previous_fill],
		data: own.call.data.clone(),
		counterdata: counter.call.data.clone(),
	};

	let calldata = args.encode_call(own.order.static_selector);
	let failed = |source: CallError| ExchangeError::StaticCallFailed { side, source };
	let ret = world
		.static_call(exchange, own.order.static_target, &calldata)
		.map_err(failed)?;
	U256::abi_decode(&ret).map_err(|e| failed(CallError::InvalidCalldata(e.to_string())))
}

/// Matches `first` against `second`.
///
/// Both orders are validated and authorized before any call runs. The first
/// call executes before the second, so the second call and both predicates
/// see the first call's effects; nothing runs in the other direction.
pub(crate) fn atomic_match(
	world: &mut World,
	frame: &Frame,
	first: &OrderSubmission,
	second: &OrderSubmission,
	metadata: B256,
) -> Result<(), ExchangeError> {
	let exchange = frame.address;
	let first_hash = hashing::hash_order(&first.order);
	let second_hash = hashing::hash_order(&second.order);

	check_parameters(world, exchange, OrderSide::First, &first.order, first_hash)?;
	check_parameters(world, exchange, OrderSide::Second, &second.order, second_hash)?;

	if first_hash == second_hash {
		return Err(ExchangeError::SelfMatch);
	}

	check_authorization(world, frame, OrderSide::First, first, first_hash)?;
	check_authorization(world, frame, OrderSide::Second, second, second_hash)?;

	let (fee, previous_first_fill, previous_second_fill) = {
		let state = world.state::<ExchangeState>(exchange)?;
		(
			FeeTerms {
				bps: state.protocol_fee_bps,
				recipient: state.fee_recipient,
			},
			state.ledger.fill(first.order.maker, first_hash),
			state.ledger.fill(second.order.maker, second_hash),
		)
	};

	execute_call(world, exchange, OrderSide::First, &first.order, &first.call)?;
	execute_call(world, exchange, OrderSide::Second, &second.order, &second.call)?;

	let new_first_fill = static_fill(world, exchange, OrderSide::First, first, second, fee, previous_first_fill)?;
	let new_second_fill = static_fill(world, exchange, OrderSide::Second, second, first, fee, previous_second_fill)?;

	let state = world.state_mut::<ExchangeState>(exchange)?;
	if new_first_fill != previous_first_fill {
		state.ledger.set_fill(first.order.maker, first_hash, new_first_fill);
	}
	if new_second_fill != previous_second_fill {
		state.ledger.set_fill(second.order.maker, second_hash, new_second_fill);
	}

	world.emit(
		exchange,
		Event::OrdersMatched {
			first_hash,
			second_hash,
			first_maker: first.order.maker,
			second_maker: second.order.maker,
			new_first_fill,
			new_second_fill,
			metadata,
		},
	)?;
	info!(
		%first_hash,
		%second_hash,
		first_maker = %first.order.maker,
		second_maker = %second.order.maker,
		%new_first_fill,
		%new_second_fill,
		"Orders matched"
	);
	Ok(())
}
