//! Per-user custody proxy.
//!
//! A proxy runs calls on behalf of its user. The user may always use it;
//! any other caller must be on the owning registry's allow-list, and the
//! proxy must not be revoked. Lifecycle:
//! `Uninitialized -> Active <-> Revoked`, with the user transferable only
//! through the registry so one user never holds two proxies.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, SolValue};
use tracing::{debug, info};
use unseen_types::abi::IAuthenticatedProxy::{self, IAuthenticatedProxyCalls};
use unseen_types::abi::IProxyRegistry;
use unseen_types::{Event, HowToCall};

use crate::error::{CallError, ProxyError};
use crate::world::{decode_calls, Frame, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStatus {
	Uninitialized,
	Active,
	Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyState {
	pub user: Address,
	pub registry: Address,
	pub revoked: bool,
	pub initialized: bool,
	/// Logic the proxy claims to run; compared against the registry's canonical one.
	pub implementation: Address,
}

impl ProxyState {
	pub fn new(implementation: Address) -> Self {
		Self {
			user: Address::ZERO,
			registry: Address::ZERO,
			revoked: false,
			initialized: false,
			implementation,
		}
	}

	pub fn status(&self) -> ProxyStatus {
		match (self.initialized, self.revoked) {
			(false, _) => ProxyStatus::Uninitialized,
			(true, false) => ProxyStatus::Active,
			(true, true) => ProxyStatus::Revoked,
		}
	}
}

/// Whether `caller` may execute through the proxy.
fn is_authorized(world: &mut World, frame: &Frame, state: &ProxyState) -> Result<bool, CallError> {
	if !state.initialized {
		return Ok(false);
	}
	if frame.caller == state.user {
		return Ok(true);
	}
	if state.revoked {
		return Ok(false);
	}
	let query = IProxyRegistry::contractsCall { addr: frame.caller }.abi_encode();
	let ret = world.static_call(frame.address, state.registry, &query)?;
	bool::abi_decode(&ret).map_err(|e| CallError::InvalidCalldata(e.to_string()))
}

/// Runs the proxied call; a failing call reports `false` instead of reverting.
fn execute(world: &mut World, frame: &Frame, dest: Address, how_to_call: u8, data: &[u8]) -> Result<bool, CallError> {
	let state = world.state::<ProxyState>(frame.address)?.clone();
	if !is_authorized(world, frame, &state)? {
		return Err(ProxyError::Unauthorized(frame.caller).into());
	}

	let how_to_call = HowToCall::from_u8(how_to_call)
		.ok_or_else(|| CallError::InvalidCalldata(format!("unknown call kind {}", how_to_call)))?;
	let result = match how_to_call {
		HowToCall::Call => world.call(frame.address, dest, data),
		HowToCall::DelegateCall => world.delegate_call(frame, dest, data),
	};

	match result {
		Ok(_) => Ok(true),
		Err(err) => {
			debug!(proxy = %frame.address, %dest, error = %err, "Proxied call failed");
			Ok(false)
		}
	}
}

fn require_user(world: &World, frame: &Frame) -> Result<ProxyState, CallError> {
	let state = world.state::<ProxyState>(frame.address)?;
	if !state.initialized || frame.caller != state.user {
		return Err(ProxyError::NotOwner.into());
	}
	Ok(state.clone())
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let proxy = frame.address;
	match decode_calls::<IAuthenticatedProxyCalls>(data)? {
		IAuthenticatedProxyCalls::initialize(call) => {
			let state = world.state_mut::<ProxyState>(proxy)?;
			if state.initialized {
				return Err(ProxyError::AlreadyInitialized.into());
			}
			state.initialized = true;
			state.user = call.user;
			state.registry = call.registry;
			Ok(Bytes::new())
		}
		IAuthenticatedProxyCalls::setRevoke(call) => {
			require_user(world, frame)?;
			world.state_mut::<ProxyState>(proxy)?.revoked = call.revoke;
			world.emit(proxy, Event::Revoked { revoked: call.revoke })?;
			Ok(Bytes::new())
		}
		IAuthenticatedProxyCalls::proxy(call) => {
			let success = execute(world, frame, call.dest, call.howToCall, &call.data)?;
			Ok(success.abi_encode().into())
		}
		IAuthenticatedProxyCalls::proxyAssert(call) => {
			if !execute(world, frame, call.dest, call.howToCall, &call.data)? {
				return Err(ProxyError::CallFailed.into());
			}
			Ok(Bytes::new())
		}
		IAuthenticatedProxyCalls::transferProxyOwnership(call) => {
			let state = require_user(world, frame)?;
			if call.newOwner == Address::ZERO {
				return Err(ProxyError::InvalidOwner(call.newOwner).into());
			}
			let transfer = IProxyRegistry::transferAccessToCall {
				from: state.user,
				to: call.newOwner,
			}
			.abi_encode();
			world.call(proxy, state.registry, &transfer)?;
			world.state_mut::<ProxyState>(proxy)?.user = call.newOwner;
			info!(%proxy, from = %state.user, to = %call.newOwner, "Proxy ownership transferred");
			Ok(Bytes::new())
		}
		IAuthenticatedProxyCalls::upgradeTo(call) => {
			let state = require_user(world, frame)?;
			if call.implementation == Address::ZERO || call.implementation == state.implementation {
				return Err(ProxyError::InvalidImplementation(call.implementation).into());
			}
			world.state_mut::<ProxyState>(proxy)?.implementation = call.implementation;
			world.emit(
				proxy,
				Event::Upgraded {
					implementation: call.implementation,
				},
			)?;
			Ok(Bytes::new())
		}
		IAuthenticatedProxyCalls::user(_) => {
			Ok(world.state::<ProxyState>(proxy)?.user.abi_encode().into())
		}
		IAuthenticatedProxyCalls::revoked(_) => {
			Ok(world.state::<ProxyState>(proxy)?.revoked.abi_encode().into())
		}
		IAuthenticatedProxyCalls::implementation(_) => {
			Ok(world.state::<ProxyState>(proxy)?.implementation.abi_encode().into())
		}
	}
}

/// Handle to a deployed proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedProxy {
	address: Address,
}

impl AuthenticatedProxy {
	pub fn at(address: Address) -> Self {
		Self { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn state<'w>(&self, world: &'w World) -> Result<&'w ProxyState, CallError> {
		world.state::<ProxyState>(self.address)
	}

	pub fn set_revoke(&self, world: &mut World, sender: Address, revoke: bool) -> Result<(), CallError> {
		let data = IAuthenticatedProxy::setRevokeCall { revoke }.abi_encode();
		world.call(sender, self.address, &data).map(drop)
	}

	/// Executes a call through the proxy; `Ok(false)` means the proxied call failed.
	pub fn proxy(
		&self,
		world: &mut World,
		sender: Address,
		dest: Address,
		how_to_call: HowToCall,
		data: Bytes,
	) -> Result<bool, CallError> {
		let call = IAuthenticatedProxy::proxyCall {
			dest,
			howToCall: how_to_call.to_u8(),
			data,
		}
		.abi_encode();
		let ret = world.call(sender, self.address, &call)?;
		bool::abi_decode(&ret).map_err(|e| CallError::InvalidCalldata(e.to_string()))
	}

	pub fn proxy_assert(
		&self,
		world: &mut World,
		sender: Address,
		dest: Address,
		how_to_call: HowToCall,
		data: Bytes,
	) -> Result<(), CallError> {
		let call = IAuthenticatedProxy::proxyAssertCall {
			dest,
			howToCall: how_to_call.to_u8(),
			data,
		}
		.abi_encode();
		world.call(sender, self.address, &call).map(drop)
	}

	pub fn transfer_proxy_ownership(&self, world: &mut World, sender: Address, new_owner: Address) -> Result<(), CallError> {
		let data = IAuthenticatedProxy::transferProxyOwnershipCall { newOwner: new_owner }.abi_encode();
		world.call(sender, self.address, &data).map(drop)
	}

	pub fn upgrade_to(&self, world: &mut World, sender: Address, implementation: Address) -> Result<(), CallError> {
		let data = IAuthenticatedProxy::upgradeToCall { implementation }.abi_encode();
		world.call(sender, self.address, &data).map(drop)
	}
}
