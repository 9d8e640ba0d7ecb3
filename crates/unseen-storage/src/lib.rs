//! Persistence for exchange ledgers and other simulator data.
//!
//! Backends implement the byte-level [`StorageInterface`]; the
//! [`StorageService`] layers namespaced, JSON-encoded values on top and knows
//! how to save and restore an exchange's fill and approval ledger.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use unseen_core::ExchangeLedger;
use unseen_types::{Address, Field, FieldType, Schema};

pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use implementations::file::FileStorage;
pub use implementations::memory::MemoryStorage;

/// Namespace under which exchange ledgers are stored, keyed by exchange address.
pub const LEDGER_NAMESPACE: &str = "ledger";

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The backend table is malformed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level key-value interface every storage backend implements.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Typed, namespaced storage over a backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Saves the fill and approval ledger of the exchange at `exchange`.
	pub async fn save_ledger(
		&self,
		exchange: Address,
		ledger: &ExchangeLedger,
	) -> Result<(), StorageError> {
		debug!(
			%exchange,
			fills = ledger.fill_count(),
			approvals = ledger.approval_count(),
			"Saving exchange ledger"
		);
		self.store(LEDGER_NAMESPACE, &exchange.to_string(), ledger)
			.await
	}

	/// Loads a previously saved ledger; `None` if there is none yet.
	pub async fn load_ledger(
		&self,
		exchange: Address,
	) -> Result<Option<ExchangeLedger>, StorageError> {
		match self
			.retrieve(LEDGER_NAMESPACE, &exchange.to_string())
			.await
		{
			Ok(ledger) => Ok(Some(ledger)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

/// Schema of the `[storage]` table.
pub fn storage_schema() -> Schema {
	Schema::new(
		vec![Field::new("backend", FieldType::String).with_validator(|value| {
			match value.as_str() {
				Some("memory") | Some("file") => Ok(()),
				other => Err(format!("unknown storage backend {:?}", other)),
			}
		})],
		vec![Field::new("path", FieldType::String)],
	)
}

/// Builds a backend from a `[storage]` table.
///
/// - `backend`: `"memory"` or `"file"`
/// - `path`: base directory for the file backend (default: `./data/ledger`)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	storage_schema()
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	match config.get("backend").and_then(|v| v.as_str()) {
		Some("file") => {
			let path = config
				.get("path")
				.and_then(|v| v.as_str())
				.unwrap_or("./data/ledger");
			Ok(Box::new(FileStorage::new(PathBuf::from(path))))
		}
		_ => Ok(Box::new(MemoryStorage::new())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use unseen_types::{B256, U256};

	fn table(document: &str) -> toml::Value {
		toml::Value::Table(toml::from_str(document).unwrap())
	}

	#[tokio::test]
	async fn test_ledger_round_trip() {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		let exchange = Address::repeat_byte(0xee);
		assert_eq!(storage.load_ledger(exchange).await.unwrap(), None);

		let mut ledger = ExchangeLedger::new();
		ledger.set_fill(Address::repeat_byte(1), B256::repeat_byte(2), U256::from(1));
		ledger.approve(Address::repeat_byte(3), B256::repeat_byte(4));
		storage.save_ledger(exchange, &ledger).await.unwrap();

		assert_eq!(storage.load_ledger(exchange).await.unwrap(), Some(ledger));
		assert_eq!(
			storage.load_ledger(Address::repeat_byte(0xef)).await.unwrap(),
			None
		);
	}

	#[tokio::test]
	async fn test_corrupt_ledger_is_an_error() {
		let backend = MemoryStorage::new();
		let exchange = Address::repeat_byte(0xee);
		backend
			.set_bytes(
				&format!("{}:{}", LEDGER_NAMESPACE, exchange),
				b"not json".to_vec(),
			)
			.await
			.unwrap();

		let storage = StorageService::new(Box::new(backend));
		assert!(matches!(
			storage.load_ledger(exchange).await,
			Err(StorageError::Serialization(_))
		));
	}

	#[tokio::test]
	async fn test_remove_and_exists() {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		storage.store("notes", "a", &"hello").await.unwrap();
		assert!(storage.exists("notes", "a").await.unwrap());

		storage.remove("notes", "a").await.unwrap();
		assert!(!storage.exists("notes", "a").await.unwrap());
		assert!(matches!(
			storage.retrieve::<String>("notes", "a").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_create_file_storage() {
		let dir = tempfile::tempdir().unwrap();
		let config = table(&format!(
			"backend = \"file\"\npath = {:?}",
			dir.path().to_string_lossy()
		));
		let storage = StorageService::new(create_storage(&config).unwrap());
		storage.store("notes", "a", &7u64).await.unwrap();

		let reopened = StorageService::new(create_storage(&config).unwrap());
		assert_eq!(reopened.retrieve::<u64>("notes", "a").await.unwrap(), 7);
	}

	#[test]
	fn test_create_storage_rejects_unknown_backend() {
		assert!(matches!(
			create_storage(&table("backend = \"redis\"")),
			Err(StorageError::Configuration(_))
		));
		assert!(matches!(
			create_storage(&table("path = \"/tmp\"")),
			Err(StorageError::Configuration(_))
		));
		assert!(create_storage(&table("backend = \"memory\"")).is_ok());
	}
}
