//! A deployed market with two funded traders, shared by exchange tests.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use unseen_static::calldata::{erc20_transfer_from, erc721_transfer_from};
use unseen_static::extra::encode_pair;
use unseen_static::TradeShape;
use unseen_types::{Call, HowToCall, Order};

use super::{ExchangeConfig, ExchangeCore, OrderSubmission};
use crate::proxy::AuthenticatedProxy;
use crate::registry::ProxyRegistry;
use crate::tokens::{Erc20Token, Erc721Token};
use crate::world::{Code, World};
use crate::atomicizer;

pub const START: u64 = 1_700_000_000;
pub const DELAY_PERIOD: u64 = 7 * 24 * 60 * 60;

pub struct Market {
	pub world: World,
	pub owner: Address,
	pub registry: ProxyRegistry,
	pub exchange: ExchangeCore,
	pub static_market: Address,
	pub atomicizer: Address,
	pub erc20: Erc20Token,
	pub erc721: Erc721Token,
	/// Seller; deploys and mints the ERC721 collection.
	pub alice: PrivateKeySigner,
	/// Buyer.
	pub bob: PrivateKeySigner,
	/// Third party that submits matches.
	pub relayer: Address,
}

pub fn signer(byte: u8) -> PrivateKeySigner {
	PrivateKeySigner::from_bytes(&B256::repeat_byte(byte)).unwrap()
}

impl Market {
	pub fn new() -> Self {
		Self::with_config(ExchangeConfig::default())
	}

	pub fn with_fee(bps: u64, recipient: Address) -> Self {
		Self::with_config(ExchangeConfig {
			protocol_fee_bps: bps,
			fee_recipient: recipient,
			..Default::default()
		})
	}

	pub fn with_config(config: ExchangeConfig) -> Self {
		let mut world = World::new(START);
		let owner = Address::repeat_byte(0x01);
		let alice = signer(0x11);
		let bob = signer(0x22);

		let registry = ProxyRegistry::deploy(&mut world, owner, DELAY_PERIOD).unwrap();
		let exchange = ExchangeCore::deploy(&mut world, owner, config, &[registry.address()]).unwrap();
		registry
			.grant_initial_authentication(&mut world, owner, exchange.address())
			.unwrap();
		let static_market = world.deploy(owner, Code::StaticMarket).unwrap();
		let atomicizer = atomicizer::deploy(&mut world, owner).unwrap();
		let erc20 = Erc20Token::deploy(&mut world, owner, "Token X", "X").unwrap();
		let erc721 = Erc721Token::deploy(&mut world, alice.address(), "Unseen Art").unwrap();

		let mut market = Self {
			world,
			owner,
			registry,
			exchange,
			static_market,
			atomicizer,
			erc20,
			erc721,
			alice,
			bob,
			relayer: Address::repeat_byte(0x0e),
		};
		market.onboard(market.alice.address());
		market.onboard(market.bob.address());
		market
	}

	/// Registers a proxy for `user` and lets it move the user's tokens.
	pub fn onboard(&mut self, user: Address) -> AuthenticatedProxy {
		let proxy = self.registry.register_proxy(&mut self.world, user).unwrap();
		self.erc20
			.approve(&mut self.world, user, proxy.address(), U256::MAX)
			.unwrap();
		self.erc721
			.set_approval_for_all(&mut self.world, user, proxy.address(), true)
			.unwrap();
		proxy
	}

	pub fn proxy_of(&self, user: Address) -> AuthenticatedProxy {
		self.registry.proxy_of(&self.world, user).unwrap().unwrap()
	}

	/// An order validated by `shape` on the market's static predicate contract.
	pub fn order(&self, maker: Address, shape: TradeShape, extra: Bytes, maximum_fill: u64, salt: u128) -> Order {
		Order {
			registry: self.registry.address(),
			maker,
			executer: maker,
			static_target: self.static_market,
			static_selector: shape.selector(),
			static_extradata: extra,
			maximum_fill: U256::from(maximum_fill),
			extra_data: Order::pack_extra_data(START - 1, 0, salt),
		}
	}

	/// Signs the EIP-712 digest of `order` for this exchange.
	pub fn sign(&self, signer: &PrivateKeySigner, order: &Order) -> Bytes {
		let hash = self.exchange.hash_order(order);
		let digest = self.exchange.hash_to_sign(&self.world, hash).unwrap();
		signer.sign_hash_sync(&digest).unwrap().as_bytes().to_vec().into()
	}

	/// Alice lists ERC721 `token_id` for `price` X; Bob makes the counter-order.
	/// Mints the token to Alice and funds Bob.
	pub fn nft_for_erc20(&mut self, token_id: u64, price: u64) -> (Order, Call, Order, Call) {
		let alice = self.alice.address();
		let bob = self.bob.address();
		let token_id = U256::from(token_id);
		let price = U256::from(price);

		self.erc721
			.mint(&mut self.world, alice, alice, token_id)
			.unwrap();
		self.erc20.mint(&mut self.world, bob, price).unwrap();

		let sell = self.order(
			alice,
			TradeShape::Erc721ForErc20,
			encode_pair([self.erc721.address(), self.erc20.address()], [token_id, price]),
			1,
			1,
		);
		let sell_call = Call::new(
			self.erc721.address(),
			HowToCall::Call,
			erc721_transfer_from(alice, bob, token_id),
		);
		let buy = self.order(
			bob,
			TradeShape::Erc20ForErc721,
			encode_pair([self.erc20.address(), self.erc721.address()], [token_id, price]),
			1,
			2,
		);
		let buy_call = Call::new(
			self.erc20.address(),
			HowToCall::Call,
			erc20_transfer_from(bob, alice, price),
		);
		(sell, sell_call, buy, buy_call)
	}

	/// Submits a match from the relayer with both orders signed by their makers.
	pub fn match_signed(&mut self, sell: &Order, sell_call: &Call, buy: &Order, buy_call: &Call) -> Result<(), super::ExchangeError> {
		let first = OrderSubmission::new(sell.clone(), sell_call.clone(), self.sign(&self.alice, sell));
		let second = OrderSubmission::new(buy.clone(), buy_call.clone(), self.sign(&self.bob, buy));
		self.exchange
			.atomic_match(&mut self.world, self.relayer, &first, &second, B256::ZERO)
	}
}
