//! Storage module for the colada system.
//!
//! This module provides the document-store seam the rest of the system is
//! built on: a thin key-value interface with collection scans, plus a typed
//! service layer handling JSON (de)serialization. The underlying managed
//! document database is deliberately abstract; backends exist for memory
//! (tests, development) and the local filesystem.

use async_trait::async_trait;
use colada_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested document is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for document-store backends.
///
/// Documents are addressed by `collection:id` keys and stored as raw bytes.
/// Backends provide per-document atomicity only; there are no multi-document
/// transactions, and callers must treat read-then-write sequences as racy.
#[async_trait]
pub trait DocumentStore: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, creating or overwriting.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns every `(id, bytes)` pair in the given collection.
	///
	/// This is the primitive behind query-by-field: the typed layer scans
	/// a collection and filters deserialized documents.
	async fn scan_bytes(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their document store.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn DocumentStore>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used by the engine builder to resolve the configured
/// primary backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level backend and provides convenient
/// methods for storing and retrieving typed documents with automatic JSON
/// serialization.
pub struct StorageService {
	/// The underlying document-store backend.
	backend: Box<dyn DocumentStore>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn DocumentStore>) -> Self {
		Self { backend }
	}

	fn key(collection: &str, id: &str) -> String {
		format!("{}:{}", collection, id)
	}

	/// Stores a serializable document, creating or overwriting.
	pub async fn store<T: Serialize>(
		&self,
		collection: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(collection, id), bytes).await
	}

	/// Retrieves and deserializes a document.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		collection: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(collection, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Updates an existing document.
	///
	/// Returns NotFound if the document does not exist, making it
	/// semantically different from store() which will create or overwrite.
	/// The exists-then-write pair is not atomic against concurrent writers.
	pub async fn update<T: Serialize>(
		&self,
		collection: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(collection, id);

		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Removes a document from storage.
	pub async fn remove(&self, collection: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(collection, id)).await
	}

	/// Checks if a document exists.
	pub async fn exists(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(collection, id)).await
	}

	/// Returns every document in a collection as `(id, value)` pairs.
	pub async fn list<T: DeserializeOwned>(
		&self,
		collection: &str,
	) -> Result<Vec<(String, T)>, StorageError> {
		let entries = self.backend.scan_bytes(collection).await?;
		let mut documents = Vec::with_capacity(entries.len());
		for (id, bytes) in entries {
			let value = serde_json::from_slice(&bytes)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;
			documents.push((id, value));
		}
		Ok(documents)
	}

	/// Returns the documents in a collection matching a predicate.
	pub async fn filter<T, P>(
		&self,
		collection: &str,
		predicate: P,
	) -> Result<Vec<(String, T)>, StorageError>
	where
		T: DeserializeOwned,
		P: Fn(&T) -> bool,
	{
		let documents = self.list::<T>(collection).await?;
		Ok(documents
			.into_iter()
			.filter(|(_, doc)| predicate(doc))
			.collect())
	}

	/// Returns the first document in a collection matching a predicate.
	///
	/// "First" carries no ordering guarantee; callers use this for fields
	/// expected to be unique (a phone number, a claimed subject). The
	/// uniqueness is best-effort only: a concurrent find-or-create against
	/// the same field can produce duplicates, per the store's model.
	pub async fn find<T, P>(
		&self,
		collection: &str,
		predicate: P,
	) -> Result<Option<(String, T)>, StorageError>
	where
		T: DeserializeOwned,
		P: Fn(&T) -> bool,
	{
		let documents = self.list::<T>(collection).await?;
		Ok(documents.into_iter().find(|(_, doc)| predicate(doc)))
	}
}
