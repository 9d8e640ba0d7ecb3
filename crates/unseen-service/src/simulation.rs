//! The reference match: one ERC721 sold for an ERC20 price.
//!
//! Every run deploys the same market into a fresh world, so contract
//! addresses and order hashes repeat between runs. The exchange ledger is
//! loaded from storage before matching and saved afterwards, which is what
//! makes a repeated run fail once the orders are filled.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;
use unseen_config::Config;
use unseen_core::{
	CallError, Deployment, Erc20Token, Erc721Token, ExchangeCore, ExchangeError, OrderSubmission,
	World,
};
use unseen_static::calldata::{
	encode_atomicized, erc20_transfer_from, erc721_transfer_from, BundledCall,
};
use unseen_static::extra::{encode_fee_trade, encode_pair};
use unseen_static::{split_fee, StaticError, TradeShape};
use unseen_storage::{StorageError, StorageService};
use unseen_types::{Call, HowToCall, Order};

use crate::order_hash::DEPLOYER;

/// Account that submits the match on behalf of both makers.
pub const RELAYER: Address = Address::repeat_byte(0x0e);

#[derive(Debug, Error)]
pub enum SimulationError {
	#[error("Invalid maker key '{name}': {message}")]
	InvalidKey { name: &'static str, message: String },
	#[error("Signing failed: {0}")]
	Signing(String),
	#[error("Fee split failed: {0}")]
	Fee(#[from] StaticError),
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	#[error(transparent)]
	Storage(#[from] StorageError),
}

impl From<CallError> for SimulationError {
	fn from(err: CallError) -> Self {
		Self::Exchange(err.into())
	}
}

/// Outcome of a successful match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
	pub exchange: Address,
	pub seller: Address,
	pub buyer: Address,
	pub token_id: U256,
	pub price: U256,
	pub protocol_fee: U256,
	pub sell_hash: B256,
	pub buy_hash: B256,
	pub sell_fill: U256,
	pub buy_fill: U256,
}

pub struct Simulation {
	config: Config,
	storage: StorageService,
}

fn parse_key(name: &'static str, key: &str) -> Result<PrivateKeySigner, SimulationError> {
	PrivateKeySigner::from_str(key).map_err(|e| SimulationError::InvalidKey {
		name,
		message: e.to_string(),
	})
}

fn sign(
	world: &World,
	exchange: ExchangeCore,
	signer: &PrivateKeySigner,
	order: &Order,
) -> Result<Bytes, SimulationError> {
	let digest = exchange.hash_to_sign(world, exchange.hash_order(order))?;
	let signature = signer
		.sign_hash_sync(&digest)
		.map_err(|e| SimulationError::Signing(e.to_string()))?;
	Ok(signature.as_bytes().to_vec().into())
}

/// Tokens and proxies the match moves assets through.
struct Assets {
	erc20: Erc20Token,
	erc721: Erc721Token,
}

impl Simulation {
	pub fn new(config: Config, storage: StorageService) -> Self {
		Self { config, storage }
	}

	fn order(&self, market: &Deployment, maker: Address, shape: TradeShape, extra: Bytes, salt: u128) -> Order {
		Order {
			registry: market.registry.address(),
			maker,
			executer: maker,
			static_target: market.static_market,
			static_selector: shape.selector(),
			static_extradata: extra,
			maximum_fill: U256::from(1),
			extra_data: Order::pack_extra_data(self.config.simulation.start_timestamp, 0, salt),
		}
	}

	fn setup_assets(
		&self,
		world: &mut World,
		market: &Deployment,
		seller: Address,
		buyer: Address,
	) -> Result<Assets, SimulationError> {
		let simulation = &self.config.simulation;
		let erc20 = Erc20Token::deploy(world, DEPLOYER, "Unseen Dollar", "USDU")?;
		let erc721 = Erc721Token::deploy(world, seller, "Unseen Collection")?;
		erc721.mint(world, seller, seller, U256::from(simulation.token_id))?;
		erc20.mint(world, buyer, U256::from(simulation.price))?;

		for user in [seller, buyer] {
			let proxy = market.registry.register_proxy(world, user)?;
			erc20.approve(world, user, proxy.address(), U256::MAX)?;
			erc721.set_approval_for_all(world, user, proxy.address(), true)?;
		}
		Ok(Assets { erc20, erc721 })
	}

	/// Seller and buyer sides of the trade. With a protocol fee the buyer pays
	/// through the atomicizer so the fee transfer rides in the same call.
	fn build_orders(
		&self,
		market: &Deployment,
		assets: &Assets,
		seller: Address,
		buyer: Address,
	) -> Result<(Order, Call, Order, Call, U256), SimulationError> {
		let exchange = &self.config.exchange;
		let token_id = U256::from(self.config.simulation.token_id);
		let price = U256::from(self.config.simulation.price);
		let (erc20, erc721) = (assets.erc20.address(), assets.erc721.address());
		let sell_call = Call::new(erc721, HowToCall::Call, erc721_transfer_from(seller, buyer, token_id));

		if exchange.protocol_fee_bps == 0 {
			let sell = self.order(
				market,
				seller,
				TradeShape::Erc721ForErc20,
				encode_pair([erc721, erc20], [token_id, price]),
				1,
			);
			let buy = self.order(
				market,
				buyer,
				TradeShape::Erc20ForErc721,
				encode_pair([erc20, erc721], [token_id, price]),
				2,
			);
			let buy_call = Call::new(erc20, HowToCall::Call, erc20_transfer_from(buyer, seller, price));
			return Ok((sell, sell_call, buy, buy_call, U256::ZERO));
		}

		let (share, fee) = split_fee(price, U256::from(exchange.protocol_fee_bps))?;
		let mut payments = vec![BundledCall::new(erc20, erc20_transfer_from(buyer, seller, share))];
		if !fee.is_zero() {
			payments.push(BundledCall::new(
				erc20,
				erc20_transfer_from(buyer, exchange.fee_recipient, fee),
			));
		}

		let sell = self.order(
			market,
			seller,
			TradeShape::Erc721ForErc20WithFee,
			encode_fee_trade([erc721, erc20, market.atomicizer], token_id, price),
			1,
		);
		let buy = self.order(
			market,
			buyer,
			TradeShape::Erc20WithFeeForErc721,
			encode_fee_trade([erc20, erc721, market.atomicizer], token_id, price),
			2,
		);
		let buy_call = Call::new(market.atomicizer, HowToCall::DelegateCall, encode_atomicized(&payments));
		Ok((sell, sell_call, buy, buy_call, fee))
	}

	/// Deploys the market, matches the two configured makers and persists the
	/// resulting ledger.
	pub async fn run(&self) -> Result<MatchReport, SimulationError> {
		let seller_key = parse_key("first_maker_key", &self.config.simulation.first_maker_key)?;
		let buyer_key = parse_key("second_maker_key", &self.config.simulation.second_maker_key)?;
		let (seller, buyer) = (seller_key.address(), buyer_key.address());

		let mut world = World::new(self.config.simulation.start_timestamp);
		let market = Deployment::deploy(
			&mut world,
			DEPLOYER,
			self.config.exchange.clone(),
			self.config.registry.delay_period_secs,
		)?;
		let exchange = market.exchange;

		if let Some(ledger) = self.storage.load_ledger(exchange.address()).await? {
			exchange.restore_ledger(&mut world, ledger)?;
		}

		let assets = self.setup_assets(&mut world, &market, seller, buyer)?;
		let (sell, sell_call, buy, buy_call, protocol_fee) =
			self.build_orders(&market, &assets, seller, buyer)?;

		let first = OrderSubmission::new(sell.clone(), sell_call, sign(&world, exchange, &seller_key, &sell)?);
		let second = OrderSubmission::new(buy.clone(), buy_call, sign(&world, exchange, &buyer_key, &buy)?);
		exchange.atomic_match(&mut world, RELAYER, &first, &second, B256::ZERO)?;

		self.storage
			.save_ledger(exchange.address(), &exchange.ledger(&world)?)
			.await?;

		let sell_hash = exchange.hash_order(&sell);
		let buy_hash = exchange.hash_order(&buy);
		let report = MatchReport {
			exchange: exchange.address(),
			seller,
			buyer,
			token_id: U256::from(self.config.simulation.token_id),
			price: U256::from(self.config.simulation.price),
			protocol_fee,
			sell_hash,
			buy_hash,
			sell_fill: exchange.fills(&world, seller, sell_hash)?,
			buy_fill: exchange.fills(&world, buyer, buy_hash)?,
		};
		info!(
			exchange = %report.exchange,
			sell_hash = %report.sell_hash,
			buy_hash = %report.buy_hash,
			"Reference match settled"
		);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;
	use unseen_core::ParameterError;
	use unseen_storage::{FileStorage, MemoryStorage};
	use unseen_types::OrderSide;

	fn memory_simulation(config: Config) -> Simulation {
		Simulation::new(config, StorageService::new(Box::new(MemoryStorage::new())))
	}

	#[tokio::test]
	async fn test_reference_match_settles_once() {
		let simulation = memory_simulation(Config::default());

		let report = simulation.run().await.unwrap();
		assert_eq!(report.sell_fill, U256::from(1));
		assert_eq!(report.buy_fill, U256::from(1));
		assert_eq!(report.protocol_fee, U256::ZERO);

		match simulation.run().await {
			Err(SimulationError::Exchange(ExchangeError::InvalidParameters { side, reason })) => {
				assert_eq!(side, OrderSide::First);
				assert_eq!(reason, ParameterError::AlreadyFilled);
			}
			other => panic!("expected an already-filled rejection, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_protocol_fee_routes_through_atomicizer() {
		let mut config = Config::default();
		config.exchange.protocol_fee_bps = 250;
		config.exchange.fee_recipient = Address::repeat_byte(0xfe);
		config.simulation.price = 1_000;

		let report = memory_simulation(config).run().await.unwrap();
		assert_eq!(report.protocol_fee, U256::from(25));
		assert_eq!(report.sell_fill, U256::from(1));
	}

	#[tokio::test]
	async fn test_file_storage_survives_restart() {
		let dir = tempfile::tempdir().unwrap();
		let storage = || StorageService::new(Box::new(FileStorage::new(PathBuf::from(dir.path()))));

		Simulation::new(Config::default(), storage())
			.run()
			.await
			.unwrap();
		assert!(Simulation::new(Config::default(), storage())
			.run()
			.await
			.is_err());
	}

	#[tokio::test]
	async fn test_invalid_key_is_reported() {
		let mut config = Config::default();
		config.simulation.second_maker_key = "0xzz".to_string();
		assert!(matches!(
			memory_simulation(config).run().await,
			Err(SimulationError::InvalidKey {
				name: "second_maker_key",
				..
			})
		));
	}
}
