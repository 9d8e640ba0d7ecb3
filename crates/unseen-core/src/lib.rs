//! Simulated contracts of the Unseen exchange.
//!
//! Everything runs inside a [`World`]: an in-memory ledger of accounts whose
//! code is one of the simulated contracts. Contracts talk to each other only
//! through ABI-encoded calls, and a failing call rolls back everything it
//! touched. The typed handles ([`ExchangeCore`], [`ProxyRegistry`],
//! [`AuthenticatedProxy`], the token handles) encode those calls for you.

pub mod atomicizer;
pub mod deployment;
pub mod error;
pub mod exchange;
pub mod proxy;
pub mod registry;
pub mod signature;
pub mod tokens;
pub mod wallet;
pub mod world;

pub use deployment::Deployment;
pub use error::{CallError, ProxyError, RegistryError, TokenError};
pub use exchange::{
	ExchangeConfig, ExchangeCore, ExchangeError, ExchangeLedger, ExchangeState, OrderSubmission,
	ParameterError,
};
pub use proxy::{AuthenticatedProxy, ProxyState, ProxyStatus};
pub use registry::{ProxyRegistry, RegistryState};
pub use tokens::{Erc1155Token, Erc20Token, Erc721Token};
pub use wallet::WalletKind;
pub use world::{Code, Contract, Frame, World};
