//! Configuration types for the simulator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use unseen_core::ExchangeConfig;

/// Complete simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
	/// Exchange deployment parameters and EIP-712 domain
	pub exchange: ExchangeConfig,
	/// Proxy registry settings
	pub registry: RegistryConfig,
	/// Where exchange ledgers are persisted
	pub storage: StorageConfig,
	/// Inputs of the reference match run by `unseen simulate`
	pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
	/// Seconds a contract waits between requesting and receiving proxy access.
	pub delay_period_secs: u64,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			delay_period_secs: 14 * 24 * 60 * 60,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
	/// Storage backend: "memory" or "file"
	pub backend: String,
	/// Base directory for the file backend
	pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: "memory".to_string(),
			path: None,
		}
	}
}

impl StorageConfig {
	/// The table handed to the storage factory.
	pub fn to_table(&self) -> toml::Value {
		let mut table = toml::Table::new();
		table.insert(
			"backend".to_string(),
			toml::Value::String(self.backend.clone()),
		);
		if let Some(path) = &self.path {
			table.insert(
				"path".to_string(),
				toml::Value::String(path.to_string_lossy().into_owned()),
			);
		}
		toml::Value::Table(table)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
	/// Block timestamp the simulated world starts at
	pub start_timestamp: u64,
	/// Private key of the seller (hex, `0x`-prefixed)
	pub first_maker_key: String,
	/// Private key of the buyer (hex, `0x`-prefixed)
	pub second_maker_key: String,
	/// ERC721 token id sold in the reference match
	pub token_id: u64,
	/// ERC20 price of the token
	pub price: u64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			start_timestamp: 1_700_000_000,
			first_maker_key: format!("0x{}", "11".repeat(32)),
			second_maker_key: format!("0x{}", "22".repeat(32)),
			token_id: 5,
			price: 100,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = Config::default();
		assert_eq!(config.exchange.name, "Unseen Exchange");
		assert_eq!(config.registry.delay_period_secs, 1_209_600);
		assert_eq!(config.storage.backend, "memory");
		assert_ne!(
			config.simulation.first_maker_key,
			config.simulation.second_maker_key
		);
	}

	#[test]
	fn test_storage_table() {
		let storage = StorageConfig {
			backend: "file".to_string(),
			path: Some(PathBuf::from("/tmp/ledger")),
		};
		let table = storage.to_table();
		assert_eq!(table.get("backend").and_then(|v| v.as_str()), Some("file"));
		assert_eq!(table.get("path").and_then(|v| v.as_str()), Some("/tmp/ledger"));

		let memory = StorageConfig::default().to_table();
		assert!(memory.get("path").is_none());
	}
}
