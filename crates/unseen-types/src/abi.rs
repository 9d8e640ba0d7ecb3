//! Solidity type definitions for every contract interaction in the simulator.
//!
//! Selectors generated from these definitions are the wire-level identifiers
//! shared with deployed contracts, so the signatures must not drift.

use alloy_sol_types::sol;

sol! {
	/// EIP-712 typed representation of an order.
	struct Order {
		address registry;
		address maker;
		address executer;
		address staticTarget;
		bytes4 staticSelector;
		bytes staticExtradata;
		uint256 maximumFill;
		uint256 extraData;
	}

	/// A call to be executed through a user proxy.
	struct Call {
		address target;
		uint8 howToCall;
		bytes data;
	}

	interface IERC20 {
		function transfer(address to, uint256 amount) external returns (bool);
		function transferFrom(address from, address to, uint256 amount) external returns (bool);
		function approve(address spender, uint256 amount) external returns (bool);
		function balanceOf(address owner) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
	}

	interface IERC721 {
		function transferFrom(address from, address to, uint256 tokenId) external;
		function approve(address to, uint256 tokenId) external;
		function setApprovalForAll(address operator, bool approved) external;
		function ownerOf(uint256 tokenId) external view returns (address);
		function mint(address to, uint256 tokenId) external;
	}

	interface IERC1155 {
		function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes data) external;
		function setApprovalForAll(address operator, bool approved) external;
		function balanceOf(address owner, uint256 id) external view returns (uint256);
	}

	interface IAtomicizer {
		function atomicize(address[] addrs, uint256[] values, uint256[] calldataLengths, bytes calldatas) external;
	}

	/// Calldata-aware signature validation.
	interface IERC1271 {
		function isValidSignature(bytes32 hash, bytes signature, bytes callData) external view returns (bytes4);
	}

	/// Legacy signature validation; magic value is `0x20c13b0b`.
	interface IERC1271Legacy {
		function isValidSignature(bytes data, bytes signature) external view returns (bytes4);
	}

	interface IAuthenticatedProxy {
		function initialize(address user, address registry) external;
		function setRevoke(bool revoke) external;
		function proxy(address dest, uint8 howToCall, bytes data) external returns (bool);
		function proxyAssert(address dest, uint8 howToCall, bytes data) external;
		function transferProxyOwnership(address newOwner) external;
		function upgradeTo(address implementation) external;
		function user() external view returns (address);
		function revoked() external view returns (bool);
		function implementation() external view returns (address);
	}

	interface IProxyRegistry {
		function registerProxy() external returns (address);
		function registerProxyFor(address user) external returns (address);
		function registerProxyOverride() external returns (address);
		function transferAccessTo(address from, address to) external;
		function grantInitialAuthentication(address authAddress) external;
		function startGrantAuthentication(address addr) external;
		function endGrantAuthentication(address addr) external;
		function revokeAuthentication(address addr) external;
		function proxies(address user) external view returns (address);
		function contracts(address addr) external view returns (bool);
		function pending(address addr) external view returns (uint256);
		function delegateProxyImplementation() external view returns (address);
	}

	/// Static predicate entry points. Every shape shares one calling convention:
	/// `addresses = [registry, maker, callTarget, counterRegistry, counterMaker, counterCallTarget, feeRecipient]`,
	/// `uints = [protocolFeeBps, maximumFill, previousFill]`.
	interface IStaticMarket {
		function any(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function anyAddOne(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function anyNoFill(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC721ForERC20(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC20ForERC721(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC721ForERC721(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC1155ForERC20(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC20ForERC1155(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC20ForERC20(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC721ForERC20WithFee(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC20WithFeeForERC721(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC721BundleForERC20(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC20ForERC721Bundle(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function LazyMintERC721ForERC20(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
		function ERC20ForLazyMintERC721(bytes extra, address[7] addresses, uint8[2] howToCalls, uint256[3] uints, bytes data, bytes counterdata) external pure returns (uint256);
	}

	interface IExchange {
		function atomicMatch(Order firstOrder, Call firstCall, Order secondOrder, Call secondCall, bytes signatures, bytes32 metadata) external;
		function approveOrderHash(bytes32 hash) external;
		function approveOrder(Order order, bool orderbookInclusionDesired) external;
		function setOrderFill(bytes32 hash, uint256 fill) external;
		function changeProtocolFee(uint256 bps) external;
		function changeFeeRecipient(address recipient) external;
		function fills(address maker, bytes32 hash) external view returns (uint256);
		function approved(address maker, bytes32 hash) external view returns (bool);
	}
}
