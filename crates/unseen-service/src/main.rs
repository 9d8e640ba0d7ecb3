use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unseen_config::{Config, ConfigLoader};
use unseen_service::{default_exchange_address, order_hashes, Simulation};
use unseen_storage::{create_storage, StorageService};
use unseen_types::Order;

#[derive(Parser)]
#[command(name = "unseen")]
#[command(about = "Unseen exchange simulator", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "UNSEEN_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Validate the configuration file
	Validate,
	/// Print the hash and signing digest of an order read from a JSON file
	HashOrder {
		/// JSON file holding the order
		file: PathBuf,
		/// Exchange whose EIP-712 domain signs the order (default: the simulated one)
		#[arg(long)]
		exchange: Option<Address>,
	},
	/// Run the reference NFT-for-ERC20 match
	Simulate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	match cli.command {
		Some(Commands::Validate) => validate_config(&config),
		Some(Commands::HashOrder { file, exchange }) => hash_order(&config, &file, exchange).await,
		Some(Commands::Simulate) | None => simulate(config).await,
	}
}

fn validate_config(config: &Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Exchange: {} v{} on chain {}", config.exchange.name, config.exchange.version, config.exchange.chain_id);
	info!("Protocol fee: {} bps", config.exchange.protocol_fee_bps);
	info!("Registry delay: {}s", config.registry.delay_period_secs);
	info!("Storage backend: {}", config.storage.backend);
	match chrono::DateTime::from_timestamp(config.simulation.start_timestamp as i64, 0) {
		Some(start) => info!("Simulation starts at {}", start.to_rfc3339()),
		None => info!("Simulation starts at timestamp {}", config.simulation.start_timestamp),
	}
	Ok(())
}

async fn hash_order(config: &Config, file: &Path, exchange: Option<Address>) -> Result<()> {
	let contents = tokio::fs::read_to_string(file)
		.await
		.with_context(|| format!("Failed to read order file {:?}", file))?;
	let order: Order = serde_json::from_str(&contents).context("Failed to parse order JSON")?;

	let exchange = match exchange {
		Some(address) => address,
		None => default_exchange_address(config).context("Failed to deploy the simulated exchange")?,
	};
	let hashes = order_hashes(&config.exchange, exchange, &order);
	println!("{}", serde_json::to_string_pretty(&hashes)?);
	Ok(())
}

async fn simulate(config: Config) -> Result<()> {
	info!("Starting reference match");
	let backend = create_storage(&config.storage.to_table()).context("Failed to create storage backend")?;
	let simulation = Simulation::new(config, StorageService::new(backend));

	let report = simulation.run().await.context("Match rejected")?;
	println!("{}", serde_json::to_string_pretty(&report)?);
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
