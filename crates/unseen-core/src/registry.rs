//! Proxy registry: one proxy per user, plus the allow-list of contracts that
//! may drive those proxies.
//!
//! The allow-list is a two-phase map. The owner queues a contract with
//! `startGrantAuthentication`, and may activate it with
//! `endGrantAuthentication` once the delay period has fully elapsed.
//! A single contract (normally the exchange) may be allowed immediately,
//! once, through `grantInitialAuthentication`.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use std::collections::{HashMap, HashSet};
use tracing::info;
use unseen_types::abi::IAuthenticatedProxy;
use unseen_types::abi::IProxyRegistry::{self, IProxyRegistryCalls};
use unseen_types::Event;

use crate::error::{CallError, RegistryError};
use crate::proxy::{AuthenticatedProxy, ProxyState};
use crate::world::{decode_calls, Code, Frame, World};

#[derive(Debug, Clone)]
pub struct RegistryState {
	pub owner: Address,
	/// Canonical logic every registered proxy must point at.
	pub delegate_proxy_implementation: Address,
	/// Seconds a queued grant waits before it may be finalized.
	pub delay_period: u64,
	pub initial_address_set: bool,
	proxies: HashMap<Address, Address>,
	contracts: HashSet<Address>,
	pending: HashMap<Address, u64>,
}

impl RegistryState {
	pub fn proxy_of(&self, user: Address) -> Option<Address> {
		self.proxies.get(&user).copied()
	}

	pub fn is_allowed(&self, contract: Address) -> bool {
		self.contracts.contains(&contract)
	}

	/// Timestamp at which a grant was queued, if any.
	pub fn pending_since(&self, contract: Address) -> Option<u64> {
		self.pending.get(&contract).copied()
	}
}

fn require_owner(world: &World, frame: &Frame) -> Result<(), CallError> {
	if world.state::<RegistryState>(frame.address)?.owner != frame.caller {
		return Err(RegistryError::NotOwner.into());
	}
	Ok(())
}

/// Deploys and initializes a fresh proxy for `user`.
fn create_proxy(world: &mut World, registry: Address, user: Address) -> Result<Address, CallError> {
	let implementation = world.state::<RegistryState>(registry)?.delegate_proxy_implementation;
	let proxy = world.deploy(registry, Code::Proxy(ProxyState::new(implementation)))?;
	let initialize = IAuthenticatedProxy::initializeCall { user, registry }.abi_encode();
	world.call(registry, proxy, &initialize)?;

	world.state_mut::<RegistryState>(registry)?.proxies.insert(user, proxy);
	world.emit(registry, Event::ProxyRegistered { user, proxy })?;
	info!(%registry, %user, %proxy, "Registered proxy");
	Ok(proxy)
}

fn register_proxy_for(world: &mut World, registry: Address, user: Address) -> Result<Address, CallError> {
	if world.state::<RegistryState>(registry)?.proxy_of(user).is_some() {
		return Err(RegistryError::ProxyExists(user).into());
	}
	create_proxy(world, registry, user)
}

pub(crate) fn handle(world: &mut World, frame: &Frame, data: &[u8]) -> Result<Bytes, CallError> {
	let registry = frame.address;
	match decode_calls::<IProxyRegistryCalls>(data)? {
		IProxyRegistryCalls::registerProxy(_) => {
			let proxy = register_proxy_for(world, registry, frame.caller)?;
			Ok(proxy.abi_encode().into())
		}
		IProxyRegistryCalls::registerProxyFor(call) => {
			let proxy = register_proxy_for(world, registry, call.user)?;
			Ok(proxy.abi_encode().into())
		}
		IProxyRegistryCalls::registerProxyOverride(_) => {
			let proxy = create_proxy(world, registry, frame.caller)?;
			Ok(proxy.abi_encode().into())
		}
		IProxyRegistryCalls::transferAccessTo(call) => {
			let state = world.state_mut::<RegistryState>(registry)?;
			let proxy = state.proxy_of(call.from);
			if proxy != Some(frame.caller) {
				return Err(RegistryError::NotProxy.into());
			}
			if state.proxy_of(call.to).is_some() {
				return Err(RegistryError::ProxyExists(call.to).into());
			}
			state.proxies.remove(&call.from);
			state.proxies.insert(call.to, frame.caller);
			world.emit(
				registry,
				Event::ProxyTransferred {
					from: call.from,
					to: call.to,
					proxy: frame.caller,
				},
			)?;
			Ok(Bytes::new())
		}
		IProxyRegistryCalls::grantInitialAuthentication(call) => {
			require_owner(world, frame)?;
			let state = world.state_mut::<RegistryState>(registry)?;
			if state.initial_address_set {
				return Err(RegistryError::InitialAuthenticationSet.into());
			}
			state.initial_address_set = true;
			state.contracts.insert(call.authAddress);
			world.emit(registry, Event::AuthenticationGranted { addr: call.authAddress })?;
			info!(%registry, contract = %call.authAddress, "Granted initial authentication");
			Ok(Bytes::new())
		}
		IProxyRegistryCalls::startGrantAuthentication(call) => {
			require_owner(world, frame)?;
			let now = world.timestamp();
			let state = world.state_mut::<RegistryState>(registry)?;
			if state.is_allowed(call.addr) {
				return Err(RegistryError::AlreadyAllowed(call.addr).into());
			}
			if state.pending.contains_key(&call.addr) {
				return Err(RegistryError::AlreadyPending(call.addr).into());
			}
			state.pending.insert(call.addr, now);
			world.emit(
				registry,
				Event::AuthenticationPending {
					addr: call.addr,
					since: now,
				},
			)?;
			info!(%registry, contract = %call.addr, since = now, "Queued authentication grant");
			Ok(Bytes::new())
		}
		IProxyRegistryCalls::endGrantAuthentication(call) => {
			require_owner(world, frame)?;
			let now = world.timestamp();
			let state = world.state_mut::<RegistryState>(registry)?;
			if state.is_allowed(call.addr) {
				return Err(RegistryError::AlreadyAllowed(call.addr).into());
			}
			let since = state
				.pending_since(call.addr)
				.ok_or(RegistryError::NotPending(call.addr))?;
			let unlocks_at = since.saturating_add(state.delay_period);
			if now <= unlocks_at {
				return Err(RegistryError::Timelocked {
					addr: call.addr,
					unlocks_at,
				}
				.into());
			}
			state.pending.remove(&call.addr);
			state.contracts.insert(call.addr);
			world.emit(registry, Event::AuthenticationGranted { addr: call.addr })?;
			info!(%registry, contract = %call.addr, "Granted authentication");
			Ok(Bytes::new())
		}
		IProxyRegistryCalls::revokeAuthentication(call) => {
			require_owner(world, frame)?;
			world
				.state_mut::<RegistryState>(registry)?
				.contracts
				.remove(&call.addr);
			world.emit(registry, Event::AuthenticationRevoked { addr: call.addr })?;
			info!(%registry, contract = %call.addr, "Revoked authentication");
			Ok(Bytes::new())
		}
		IProxyRegistryCalls::proxies(call) => {
			let proxy = world
				.state::<RegistryState>(registry)?
				.proxy_of(call.user)
				.unwrap_or_default();
			Ok(proxy.abi_encode().into())
		}
		IProxyRegistryCalls::contracts(call) => {
			let allowed = world.state::<RegistryState>(registry)?.is_allowed(call.addr);
			Ok(allowed.abi_encode().into())
		}
		IProxyRegistryCalls::pending(call) => {
			let since = world
				.state::<RegistryState>(registry)?
				.pending_since(call.addr)
				.unwrap_or_default();
			Ok(U256::from(since).abi_encode().into())
		}
		IProxyRegistryCalls::delegateProxyImplementation(_) => {
			let implementation = world
				.state::<RegistryState>(registry)?
				.delegate_proxy_implementation;
			Ok(implementation.abi_encode().into())
		}
	}
}

/// Handle to a deployed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyRegistry {
	address: Address,
}

impl ProxyRegistry {
	/// Deploys the canonical proxy implementation and a registry owned by `owner`.
	pub fn deploy(world: &mut World, owner: Address, delay_period: u64) -> Result<Self, CallError> {
		let implementation = world.deploy(owner, Code::ProxyImplementation)?;
		let state = RegistryState {
			owner,
			delegate_proxy_implementation: implementation,
			delay_period,
			initial_address_set: false,
			proxies: HashMap::new(),
			contracts: HashSet::new(),
			pending: HashMap::new(),
		};
		let address = world.deploy(owner, Code::Registry(state))?;
		Ok(Self { address })
	}

	pub fn at(address: Address) -> Self {
		Self { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn state<'w>(&self, world: &'w World) -> Result<&'w RegistryState, CallError> {
		world.state::<RegistryState>(self.address)
	}

	pub fn proxy_of(&self, world: &World, user: Address) -> Result<Option<AuthenticatedProxy>, CallError> {
		Ok(self.state(world)?.proxy_of(user).map(AuthenticatedProxy::at))
	}

	pub fn is_allowed(&self, world: &World, contract: Address) -> Result<bool, CallError> {
		Ok(self.state(world)?.is_allowed(contract))
	}

	fn send<C: SolCall>(&self, world: &mut World, sender: Address, call: C) -> Result<Bytes, CallError> {
		world.call(sender, self.address, &call.abi_encode())
	}

	fn send_for_proxy<C: SolCall>(&self, world: &mut World, sender: Address, call: C) -> Result<AuthenticatedProxy, CallError> {
		let ret = self.send(world, sender, call)?;
		let proxy = Address::abi_decode(&ret).map_err(|e| CallError::InvalidCalldata(e.to_string()))?;
		Ok(AuthenticatedProxy::at(proxy))
	}

	pub fn register_proxy(&self, world: &mut World, sender: Address) -> Result<AuthenticatedProxy, CallError> {
		self.send_for_proxy(world, sender, IProxyRegistry::registerProxyCall {})
	}

	pub fn register_proxy_for(&self, world: &mut World, sender: Address, user: Address) -> Result<AuthenticatedProxy, CallError> {
		self.send_for_proxy(world, sender, IProxyRegistry::registerProxyForCall { user })
	}

	pub fn register_proxy_override(&self, world: &mut World, sender: Address) -> Result<AuthenticatedProxy, CallError> {
		self.send_for_proxy(world, sender, IProxyRegistry::registerProxyOverrideCall {})
	}

	pub fn transfer_access_to(&self, world: &mut World, sender: Address, from: Address, to: Address) -> Result<(), CallError> {
		self.send(world, sender, IProxyRegistry::transferAccessToCall { from, to }).map(drop)
	}

	pub fn grant_initial_authentication(&self, world: &mut World, sender: Address, contract: Address) -> Result<(), CallError> {
		self.send(
			world,
			sender,
			IProxyRegistry::grantInitialAuthenticationCall {
				authAddress: contract,
			},
		)
		.map(drop)
	}

	pub fn start_grant_authentication(&self, world: &mut World, sender: Address, contract: Address) -> Result<(), CallError> {
		self.send(world, sender, IProxyRegistry::startGrantAuthenticationCall { addr: contract })
			.map(drop)
	}

	pub fn end_grant_authentication(&self, world: &mut World, sender: Address, contract: Address) -> Result<(), CallError> {
		self.send(world, sender, IProxyRegistry::endGrantAuthenticationCall { addr: contract })
			.map(drop)
	}

	pub fn revoke_authentication(&self, world: &mut World, sender: Address, contract: Address) -> Result<(), CallError> {
		self.send(world, sender, IProxyRegistry::revokeAuthenticationCall { addr: contract })
			.map(drop)
	}
}
