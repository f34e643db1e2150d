//! In-memory storage backend.
//!
//! This module provides a memory-based implementation of the DocumentStore
//! trait, useful for testing and development scenarios where persistence is
//! not required.

use crate::{DocumentStore, StorageError, StorageFactory, StorageRegistry};
use async_trait::async_trait;
use colada_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory document store.
///
/// Documents live in a HashMap behind a read-write lock, providing fast
/// access but no persistence across restarts.
pub struct MemoryStore {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
	/// Creates a new MemoryStore instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn scan_bytes(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let prefix = format!("{}:", collection);
		let store = self.store.read().await;
		Ok(store
			.iter()
			.filter_map(|(key, value)| {
				key.strip_prefix(&prefix)
					.map(|id| (id.to_string(), value.clone()))
			})
			.collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStoreSchema)
	}
}

/// Configuration schema for MemoryStore.
pub struct MemoryStoreSchema;

impl ConfigSchema for MemoryStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory storage has no required configuration
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl StorageRegistry for Registry {}

/// Factory function to create a memory store from configuration.
///
/// Configuration parameters: none required.
pub fn create_store(_config: &toml::Value) -> Result<Box<dyn DocumentStore>, StorageError> {
	Ok(Box::new(MemoryStore::new()))
}
