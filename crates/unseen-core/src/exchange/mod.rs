//! The exchange: order hashing, authorization, parameter validation,
//! atomic matching and fill bookkeeping.
//!
//! All state-changing entry points run through the exchange's ABI (see
//! [`handle`]) so that they obey the world's frame rollback and can be
//! reached by other contracts. [`ExchangeCore`] is the native handle that
//! encodes those calls and turns reverts back into [`ExchangeError`]s.

mod authorization;
mod error;
pub mod hashing;
mod ledger;
mod matching;

#[cfg(test)]
pub(crate) mod fixture;

pub use error::{ExchangeError, ParameterError};
pub use ledger::{ApprovalRecord, ExchangeLedger, FillRecord};
pub use matching::OrderSubmission;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;
use unseen_types::abi::IExchange::{self, IExchangeCalls};
use unseen_types::{Call, Event, Order};

use crate::error::CallError;
use crate::signature::PERSONAL_SIGN_PREFIX;
use crate::world::{decode_calls, Code, Frame, World};
use unseen_static::INVERSE_BASIS_POINT;

/// Deployment parameters of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
	/// EIP-712 domain name.
	pub name: String,
	/// EIP-712 domain version.
	pub version: String,
	pub chain_id: u64,
	/// Prefix used when recovering personal-message signatures.
	pub personal_sign_prefix: String,
	pub protocol_fee_bps: u64,
	pub fee_recipient: Address,
}

impl Default for ExchangeConfig {
	fn default() -> Self {
		Self {
			name: "Unseen Exchange".to_string(),
			version: "1.0".to_string(),
			chain_id: 1,
			personal_sign_prefix: PERSONAL_SIGN_PREFIX.to_string(),
			protocol_fee_bps: 0,
			fee_recipient: Address::ZERO,
		}
	}
}

#[derive(Debug, Clone)]
pub struct ExchangeState {
	pub config: ExchangeConfig,
	pub owner: Address,
	pub protocol_fee_bps: U256,
	pub fee_recipient: Address,
	registries: HashSet<Address>,
	pub(crate) ledger: ExchangeLedger,
	entered: bool,
}

impl ExchangeState {
	pub fn is_trusted_registry(&self, registry: Address) -> bool {
		self.registries.contains(&registry)
	}

	pub fn ledger(&self) -> &ExchangeLedger {
		&self.ledger
	}
}

/// Runs `body` under the exchange's reentrancy lock.
fn non_reentrant<T>(
	world: &mut World,
	exchange: Address,
	body: impl FnOnce(&mut World) -> Result<T, ExchangeError>,
) -> Result<T, ExchangeError> {
	let state = world.state_mut::<ExchangeState>(exchange)?;
	if state.entered {
		return Err(ExchangeError::Reentrancy);
	}
	state.entered = true;
	let result = body(world);
	world.state_mut::<ExchangeState>(exchange)?.entered = false;
	result
}

fn require_owner(world: &World, frame: &Frame) -> Result<(), ExchangeError> {
	if world.state::<ExchangeState>(frame.address)?.owner != frame.caller {
		return Err(ExchangeError::NotOwner);
	}
	Ok(())
}

fn approve_order_hash(world: &mut World, frame: &Frame, hash: B256) -> Result<(), ExchangeError> {
	let state = world.state_mut::<ExchangeState>(frame.address)?;
	if !state.ledger.approve(frame.caller, hash) {
		return Err(ExchangeError::AlreadyApproved);
	}
	world.emit(
		frame.address,
		Event::OrderHashApproved {
			hash,
			maker: frame.caller,
		},
	)?;
	info!(%hash, approver = %frame.caller, "Approved order hash");
	Ok(())
}

fn approve_order(world: &mut World, frame: &Frame, order: &Order, order_book_inclusion_desired: bool) -> Result<(), ExchangeError> {
	if order.executer != frame.caller {
		return Err(ExchangeError::NotOrderExecuter);
	}
	let hash = hashing::hash_order(order);
	let state = world.state_mut::<ExchangeState>(frame.address)?;
	if !state.ledger.approve(frame.caller, hash) {
		return Err(ExchangeError::AlreadyApproved);
	}
	world.emit(
		frame.address,
		Event::OrderApproved {
			hash,
			registry: order.registry,
			maker: order.maker,
			executer: order.executer,
			static_target: order.static_target,
			static_selector: order.static_selector,
			static_extradata: order.static_extradata.clone(),
			maximum_fill: order.maximum_fill,
			extra_data: order.extra_data,
			order_book_inclusion_desired,
		},
	)?;
	info!(%hash, maker = %order.maker, order_book_inclusion_desired, "Approved order");
	Ok(())
}

fn set_order_fill(world: &mut World, frame: &Frame, hash: B256, fill: U256) -> Result<(), ExchangeError> {
	world
		.state_mut::<ExchangeState>(frame.address)?
		.ledger
		.set_fill(frame.caller, hash, fill);
	world.emit(
		frame.address,
		Event::OrderFillChanged {
			hash,
			maker: frame.caller,
			new_fill: fill,
		},
	)?;
	info!(%hash, maker = %frame.caller, %fill, "Order fill changed");
	Ok(())
}

fn change_protocol_fee(world: &mut World, frame: &Frame, bps: U256) -> Result<(), ExchangeError> {
	require_owner(world, frame)?;
	if bps > U256::from(INVERSE_BASIS_POINT) {
		return Err(ExchangeError::FeeTooHigh { bps });
	}
	world.state_mut::<ExchangeState>(frame.address)?.protocol_fee_bps = bps;
	world.emit(frame.address, Event::ProtocolFeeChanged { bps })?;
	info!(%bps, "Protocol fee changed");
	Ok(())
}

fn change_fee_recipient(world: &mut World, frame: &Frame, recipient: Address) -> Result<(), ExchangeError> {
	require_owner(world, frame)?;
	world.state_mut::<ExchangeState>(frame.address)?.fee_recipient = recipient;
	world.emit(frame.address, Event::FeeRecipientChanged { recipient })?;
	info!(%recipient, "Fee recipient changed");
	Ok(())
}

fn decode_signatures(signatures: &[u8]) -> Result<(Bytes, Bytes), ExchangeError> {
	<(Bytes, Bytes)>::abi_decode_params(signatures).map_err(|e| ExchangeError::InvalidSignatures(e.to_string()))
}

fn decode_call(call: unseen_types::abi::Call) -> Result<Call, CallError> {
	let how_to_call = call.howToCall;
	Call::from_sol(call).ok_or_else(|| CallError::InvalidCalldata(format!("unknown call kind {}", how_to_call)))
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let exchange = frame.address;
	match decode_calls::<IExchangeCalls>(data)? {
		IExchangeCalls::atomicMatch(call) => {
			let metadata = call.metadata;
			let (first_signature, second_signature) = decode_signatures(&call.signatures)?;
			let first = OrderSubmission::new(call.firstOrder.into(), decode_call(call.firstCall)?, first_signature);
			let second = OrderSubmission::new(call.secondOrder.into(), decode_call(call.secondCall)?, second_signature);
			non_reentrant(world, exchange, |world| {
				matching::atomic_match(world, frame, &first, &second, metadata)
			})?;
			Ok(Bytes::new())
		}
		IExchangeCalls::approveOrderHash(call) => {
			non_reentrant(world, exchange, |world| approve_order_hash(world, frame, call.hash))?;
			Ok(Bytes::new())
		}
		IExchangeCalls::approveOrder(call) => {
			let order = Order::from(call.order);
			non_reentrant(world, exchange, |world| {
				approve_order(world, frame, &order, call.orderbookInclusionDesired)
			})?;
			Ok(Bytes::new())
		}
		IExchangeCalls::setOrderFill(call) => {
			non_reentrant(world, exchange, |world| set_order_fill(world, frame, call.hash, call.fill))?;
			Ok(Bytes::new())
		}
		IExchangeCalls::changeProtocolFee(call) => {
			change_protocol_fee(world, frame, call.bps)?;
			Ok(Bytes::new())
		}
		IExchangeCalls::changeFeeRecipient(call) => {
			change_fee_recipient(world, frame, call.recipient)?;
			Ok(Bytes::new())
		}
		IExchangeCalls::fills(call) => {
			let fill = world.state::<ExchangeState>(exchange)?.ledger.fill(call.maker, call.hash);
			Ok(fill.abi_encode().into())
		}
		IExchangeCalls::approved(call) => {
			let approved = world
				.state::<ExchangeState>(exchange)?
				.ledger
				.is_approved(call.maker, call.hash);
			Ok(approved.abi_encode().into())
		}
	}
}

/// Handle to a deployed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeCore {
	address: Address,
}

impl ExchangeCore {
	/// Deploys an exchange trusting `registries`.
	pub fn deploy(
		world: &mut World,
		owner: Address,
		config: ExchangeConfig,
		registries: &[Address],
	) -> Result<Self, ExchangeError> {
		if registries.is_empty() {
			return Err(ExchangeError::Configuration("at least one registry is required".to_string()));
		}
		if registries.contains(&Address::ZERO) {
			return Err(ExchangeError::Configuration("registry address is zero".to_string()));
		}
		if config.protocol_fee_bps > INVERSE_BASIS_POINT {
			return Err(ExchangeError::FeeTooHigh {
				bps: U256::from(config.protocol_fee_bps),
			});
		}
		if config.protocol_fee_bps > 0 && config.fee_recipient == Address::ZERO {
			return Err(ExchangeError::Configuration(
				"a protocol fee requires a fee recipient".to_string(),
			));
		}

		let state = ExchangeState {
			owner,
			protocol_fee_bps: U256::from(config.protocol_fee_bps),
			fee_recipient: config.fee_recipient,
			config,
			registries: registries.iter().copied().collect(),
			ledger: ExchangeLedger::new(),
			entered: false,
		};
		let address = world.deploy(owner, Code::Exchange(state))?;
		info!(%address, %owner, registries = registries.len(), "Deployed exchange");
		Ok(Self { address })
	}

	pub fn at(address: Address) -> Self {
		Self { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn state<'w>(&self, world: &'w World) -> Result<&'w ExchangeState, ExchangeError> {
		Ok(world.state::<ExchangeState>(self.address)?)
	}

	pub fn domain_separator(&self, world: &World) -> Result<B256, ExchangeError> {
		Ok(hashing::domain_separator(&self.state(world)?.config, self.address))
	}

	pub fn hash_order(&self, order: &Order) -> B256 {
		hashing::hash_order(order)
	}

	pub fn hash_to_sign(&self, world: &World, hash: B256) -> Result<B256, ExchangeError> {
		Ok(hashing::hash_to_sign(self.domain_separator(world)?, hash))
	}

	pub fn fills(&self, world: &World, maker: Address, hash: B256) -> Result<U256, ExchangeError> {
		Ok(self.state(world)?.ledger.fill(maker, hash))
	}

	pub fn approved(&self, world: &World, approver: Address, hash: B256) -> Result<bool, ExchangeError> {
		Ok(self.state(world)?.ledger.is_approved(approver, hash))
	}

	/// Why the order cannot be matched right now, if anything.
	pub fn check_order_parameters(&self, world: &World, order: &Order, hash: B256) -> Result<Option<ParameterError>, ExchangeError> {
		Ok(matching::parameter_error(world, self.address, order, hash)?)
	}

	pub fn validate_order_parameters(&self, world: &World, order: &Order, hash: B256) -> Result<bool, ExchangeError> {
		Ok(self.check_order_parameters(world, order, hash)?.is_none())
	}

	/// Runs the authorization strategies as if `sender` submitted the order.
	pub fn validate_order_authorization(
		&self,
		world: &mut World,
		sender: Address,
		order: &Order,
		signature: &[u8],
		calldata: &[u8],
	) -> Result<bool, ExchangeError> {
		let request = authorization::AuthorizationRequest {
			exchange: self.address,
			sender,
			order,
			hash: hashing::hash_order(order),
			signature,
			calldata,
		};
		Ok(authorization::authorize(world, &request)?)
	}

	fn send<C: SolCall>(&self, world: &mut World, sender: Address, call: C) -> Result<(), ExchangeError> {
		world.call(sender, self.address, &call.abi_encode())?;
		Ok(())
	}

	/// Matches two orders atomically; on error nothing changes.
	pub fn atomic_match(
		&self,
		world: &mut World,
		sender: Address,
		first: &OrderSubmission,
		second: &OrderSubmission,
		metadata: B256,
	) -> Result<(), ExchangeError> {
		let signatures = (first.signature.clone(), second.signature.clone()).abi_encode_params();
		self.send(
			world,
			sender,
			IExchange::atomicMatchCall {
				firstOrder: first.order.to_sol(),
				firstCall: first.call.to_sol(),
				secondOrder: second.order.to_sol(),
				secondCall: second.call.to_sol(),
				signatures: signatures.into(),
				metadata,
			},
		)
	}

	pub fn approve_order_hash(&self, world: &mut World, sender: Address, hash: B256) -> Result<(), ExchangeError> {
		self.send(world, sender, IExchange::approveOrderHashCall { hash })
	}

	pub fn approve_order(
		&self,
		world: &mut World,
		sender: Address,
		order: &Order,
		order_book_inclusion_desired: bool,
	) -> Result<(), ExchangeError> {
		self.send(
			world,
			sender,
			IExchange::approveOrderCall {
				order: order.to_sol(),
				orderbookInclusionDesired: order_book_inclusion_desired,
			},
		)
	}

	pub fn set_order_fill(&self, world: &mut World, sender: Address, hash: B256, fill: U256) -> Result<(), ExchangeError> {
		self.send(world, sender, IExchange::setOrderFillCall { hash, fill })
	}

	pub fn change_protocol_fee(&self, world: &mut World, sender: Address, bps: U256) -> Result<(), ExchangeError> {
		self.send(world, sender, IExchange::changeProtocolFeeCall { bps })
	}

	pub fn change_fee_recipient(&self, world: &mut World, sender: Address, recipient: Address) -> Result<(), ExchangeError> {
		self.send(world, sender, IExchange::changeFeeRecipientCall { recipient })
	}

	/// Copy of the fill and approval records, for persistence.
	pub fn ledger(&self, world: &World) -> Result<ExchangeLedger, ExchangeError> {
		Ok(self.state(world)?.ledger.clone())
	}

	/// Replaces the fill and approval records with a persisted copy.
	pub fn restore_ledger(&self, world: &mut World, ledger: ExchangeLedger) -> Result<(), ExchangeError> {
		world.state_mut::<ExchangeState>(self.address)?.ledger = ledger;
		info!(
			exchange = %self.address,
			fills = world.state::<ExchangeState>(self.address)?.ledger.fill_count(),
			"Restored exchange ledger"
		);
		Ok(())
	}
}
