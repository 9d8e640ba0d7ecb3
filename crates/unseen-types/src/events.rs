//! Ledger events emitted by simulated contracts.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use serde::{Deserialize, Serialize};

/// An event together with the address of the contract that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
	pub address: Address,
	pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
	/// Two orders were matched atomically.
	OrdersMatched {
		first_hash: B256,
		second_hash: B256,
		first_maker: Address,
		second_maker: Address,
		new_first_fill: U256,
		new_second_fill: U256,
		metadata: B256,
	},
	/// An order was approved on-ledger by its maker.
	OrderApproved {
		hash: B256,
		registry: Address,
		maker: Address,
		executer: Address,
		static_target: Address,
		static_selector: FixedBytes<4>,
		static_extradata: Bytes,
		maximum_fill: U256,
		extra_data: U256,
		order_book_inclusion_desired: bool,
	},
	/// A bare order hash was approved.
	OrderHashApproved { hash: B256, maker: Address },
	/// A maker reset the fill of one of their orders.
	OrderFillChanged {
		hash: B256,
		maker: Address,
		new_fill: U256,
	},
	ProtocolFeeChanged { bps: U256 },
	FeeRecipientChanged { recipient: Address },

	/// ERC20 value or ERC721 token id moved.
	Transfer { from: Address, to: Address, value: U256 },
	/// ERC1155 single transfer.
	TransferSingle {
		operator: Address,
		from: Address,
		to: Address,
		id: U256,
		value: U256,
	},
	Approval {
		owner: Address,
		spender: Address,
		value: U256,
	},
	ApprovalForAll {
		owner: Address,
		operator: Address,
		approved: bool,
	},

	/// Proxy revocation toggled by its owner.
	Revoked { revoked: bool },
	/// Proxy implementation pointer moved.
	Upgraded { implementation: Address },
	ProxyRegistered { user: Address, proxy: Address },
	ProxyTransferred {
		from: Address,
		to: Address,
		proxy: Address,
	},
	AuthenticationPending { addr: Address, since: u64 },
	AuthenticationGranted { addr: Address },
	AuthenticationRevoked { addr: Address },
}
