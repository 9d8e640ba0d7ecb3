//! Order authorization.
//!
//! Authorization runs an ordered list of strategies against the order's
//! executer. Each strategy accepts, rejects, or declares itself not
//! applicable; the first definite answer wins and an exhausted list means
//! unauthorized. No strategy ever fails the surrounding call: reverting
//! signature probes count as "not applicable".

use alloy_primitives::{Address, FixedBytes, B256};
use alloy_sol_types::{SolCall, SolValue};
use tracing::debug;
use unseen_types::abi::{IERC1271, IERC1271Legacy};
use unseen_types::Order;

use super::{hashing, ExchangeState};
use crate::error::CallError;
use crate::signature::{self, PERSONAL_SIGN_MARKER, SIGNATURE_LENGTH};
use crate::wallet::{calldata_aware_magic, legacy_magic};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	Accepted,
	Rejected,
	NotApplicable,
}

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
	pub exchange: Address,
	/// `msg.sender` of the exchange call.
	pub sender: Address,
	pub order: &'a Order,
	pub hash: B256,
	pub signature: &'a [u8],
	/// Calldata of the order's call, handed to calldata-aware wallets.
	pub calldata: &'a [u8],
}

type Strategy = fn(&mut World, &AuthorizationRequest<'_>) -> Result<Verdict, CallError>;

const STRATEGIES: [(&str, Strategy); 6] = [
	("previously-filled", previously_filled),
	("direct-sender", direct_sender),
	("pre-approved", pre_approved),
	("contract-calldata-aware", contract_calldata_aware),
	("contract-legacy", contract_legacy),
	("externally-owned", externally_owned),
];

/// Whether the order is authorized for this match.
pub fn authorize(world: &mut World, request: &AuthorizationRequest<'_>) -> Result<bool, CallError> {
	for (name, strategy) in STRATEGIES {
		match strategy(world, request)? {
			Verdict::Accepted => {
				debug!(hash = %request.hash, strategy = name, "Order authorized");
				return Ok(true);
			}
			Verdict::Rejected => {
				debug!(hash = %request.hash, strategy = name, "Order authorization rejected");
				return Ok(false);
			}
			Verdict::NotApplicable => {}
		}
	}
	debug!(hash = %request.hash, "No authorization strategy applied");
	Ok(false)
}

fn exchange_state<'w>(world: &'w World, request: &AuthorizationRequest<'_>) -> Result<&'w ExchangeState, CallError> {
	world.state::<ExchangeState>(request.exchange)
}

fn signing_hash(world: &World, request: &AuthorizationRequest<'_>) -> Result<B256, CallError> {
	let state = exchange_state(world, request)?;
	let separator = hashing::domain_separator(&state.config, request.exchange);
	Ok(hashing::hash_to_sign(separator, request.hash))
}

/// A partially filled order was authorized when it was first matched.
/// Keyed by the executer, the same account every other strategy checks.
fn previously_filled(world: &mut World, request: &AuthorizationRequest<'_>) -> Result<Verdict, CallError> {
	let filled = !exchange_state(world, request)?
		.ledger
		.fill(request.order.executer, request.hash)
		.is_zero();
	Ok(if filled { Verdict::Accepted } else { Verdict::NotApplicable })
}

fn direct_sender(_world: &mut World, request: &AuthorizationRequest<'_>) -> Result<Verdict, CallError> {
	Ok(if request.sender == request.order.executer {
		Verdict::Accepted
	} else {
		Verdict::NotApplicable
	})
}

fn pre_approved(world: &mut World, request: &AuthorizationRequest<'_>) -> Result<Verdict, CallError> {
	let approved = exchange_state(world, request)?
		.ledger
		.is_approved(request.order.executer, request.hash);
	Ok(if approved { Verdict::Accepted } else { Verdict::NotApplicable })
}

/// Probes a contract signer; a revert or malformed answer is not applicable.
fn probe_wallet(
	world: &mut World,
	request: &AuthorizationRequest<'_>,
	data: &[u8],
	magic: FixedBytes<4>,
) -> Verdict {
	let answer = world
		.static_call(request.exchange, request.order.executer, data)
		.ok()
		.and_then(|ret| FixedBytes::<4>::abi_decode(&ret).ok());
	match answer {
		Some(value) if value == magic => Verdict::Accepted,
		Some(_) => Verdict::Rejected,
		None => Verdict::NotApplicable,
	}
}

fn contract_calldata_aware(world: &mut World, request: &AuthorizationRequest<'_>) -> Result<Verdict, CallError> {
	if !world.has_code(request.order.executer) {
		return Ok(Verdict::NotApplicable);
	}
	let query = IERC1271::isValidSignatureCall {
		hash: signing_hash(world, request)?,
		signature: request.signature.to_vec().into(),
		callData: request.calldata.to_vec().into(),
	}
	.abi_encode();
	Ok(probe_wallet(world, request, &query, calldata_aware_magic()))
}

fn contract_legacy(world: &mut World, request: &AuthorizationRequest<'_>) -> Result<Verdict, CallError> {
	if !world.has_code(request.order.executer) {
		return Ok(Verdict::NotApplicable);
	}
	let query = IERC1271Legacy::isValidSignatureCall {
		data: signing_hash(world, request)?.to_vec().into(),
		signature: request.signature.to_vec().into(),
	}
	.abi_encode();
	Ok(probe_wallet(world, request, &query, legacy_magic()))
}

fn externally_owned(world: &mut World, request: &AuthorizationRequest<'_>) -> Result<Verdict, CallError> {
	if world.has_code(request.order.executer) {
		return Ok(Verdict::NotApplicable);
	}

	let mut digest = signing_hash(world, request)?;
	let personal = request.signature.len() > SIGNATURE_LENGTH
		&& request.signature.last() == Some(&PERSONAL_SIGN_MARKER);
	if personal {
		let prefix = &exchange_state(world, request)?.config.personal_sign_prefix;
		digest = signature::personal_sign_hash(prefix, digest);
	}

	Ok(match signature::recover(digest, request.signature) {
		Some(signer) if signer == request.order.executer => Verdict::Accepted,
		_ => Verdict::Rejected,
	})
}
