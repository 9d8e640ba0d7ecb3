//! Runnable surface of the Unseen simulator: the reference match and order
//! hashing used by the `unseen` binary.

pub mod order_hash;
pub mod simulation;

pub use order_hash::{default_exchange_address, order_hashes, OrderHashes};
pub use simulation::{MatchReport, Simulation, SimulationError};
