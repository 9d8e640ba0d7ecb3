//! Minimal token contracts the exchange moves assets through.
//!
//! Each token has a state struct stored in the world and a lightweight
//! handle that encodes calls to it. Handles route state-changing operations
//! through [`World::call`](crate::World::call) so they obey the same
//! authorization and rollback rules as calls made from other contracts;
//! `mint` on the fungible tokens is a direct setup helper.

pub mod erc1155;
pub mod erc20;
pub mod erc721;

pub use erc1155::{Erc1155State, Erc1155Token};
pub use erc20::{Erc20State, Erc20Token};
pub use erc721::{Erc721State, Erc721Token};
