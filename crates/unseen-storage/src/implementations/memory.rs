//! In-memory storage backed by a concurrent map.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.entries
			.get(key)
			.map(|entry| entry.value().clone())
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.entries.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.entries.contains_key(key))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_set_get_delete() {
		let storage = MemoryStorage::new();
		storage.set_bytes("a", vec![1]).await.unwrap();
		assert_eq!(storage.get_bytes("a").await.unwrap(), vec![1]);
		assert!(storage.exists("a").await.unwrap());

		storage.delete("a").await.unwrap();
		assert!(matches!(storage.get_bytes("a").await, Err(StorageError::NotFound)));
		assert!(!storage.exists("a").await.unwrap());
	}

	#[tokio::test]
	async fn test_overwrite_replaces_value() {
		let storage = MemoryStorage::new();
		storage.set_bytes("a", vec![1]).await.unwrap();
		storage.set_bytes("a", vec![2, 3]).await.unwrap();
		assert_eq!(storage.get_bytes("a").await.unwrap(), vec![2, 3]);
	}
}
