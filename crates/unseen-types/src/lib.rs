//! Shared types for the Unseen exchange simulator.
//!
//! This crate holds the order data model, the Solidity ABI definitions used
//! on the wire between the exchange, proxies, tokens and static validators,
//! the ledger events emitted by every simulated contract, and the schema
//! helpers used to validate configuration tables.

pub mod abi;
pub mod events;
pub mod order;
pub mod validation;

pub use events::*;
pub use order::*;
pub use validation::*;

pub use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
