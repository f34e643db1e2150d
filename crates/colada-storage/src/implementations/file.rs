//! File-based storage backend.
//!
//! This module persists each document as a JSON file under a per-collection
//! directory, providing simple durability without an external database.
//! Writes go through a temp-file-then-rename sequence so a crashed write
//! never leaves a half-written document behind.

use crate::{DocumentStore, StorageError, StorageFactory, StorageRegistry};
use async_trait::async_trait;
use colada_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;

/// File-based document store.
pub struct FileStore {
	/// Base directory path for storing collections.
	base_path: PathBuf,
}

impl FileStore {
	/// Creates a new FileStore instance rooted at the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a `collection:id` key to a filesystem path.
	///
	/// Sanitizes both components by replacing path-hostile characters.
	fn file_path(&self, key: &str) -> PathBuf {
		let (collection, id) = key.split_once(':').unwrap_or(("misc", key));
		let safe_collection = collection.replace(['/', ':', '.'], "_");
		let safe_id = id.replace(['/', ':'], "_");
		self.base_path
			.join(safe_collection)
			.join(format!("{}.json", safe_id))
	}

	fn collection_dir(&self, collection: &str) -> PathBuf {
		self.base_path.join(collection.replace(['/', ':', '.'], "_"))
	}
}

#[async_trait]
impl DocumentStore for FileStore {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key);

		// Create parent directory if it doesn't exist
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.file_path(key).exists())
	}

	async fn scan_bytes(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let dir = self.collection_dir(collection);
		if !dir.exists() {
			return Ok(Vec::new());
		}

		let mut documents = Vec::new();
		let mut entries = fs::read_dir(&dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("json")) {
				continue;
			}
			let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
				continue;
			};
			match fs::read(&path).await {
				Ok(data) => documents.push((id.to_string(), data)),
				Err(e) => {
					tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
				},
			}
		}

		Ok(documents)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStoreSchema)
	}
}

/// Configuration schema for FileStore.
pub struct FileStoreSchema;

impl ConfigSchema for FileStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl StorageRegistry for Registry {}

/// Factory function to create a file store from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for document files (default: "./data")
pub fn create_store(config: &toml::Value) -> Result<Box<dyn DocumentStore>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data")
		.to_string();

	Ok(Box::new(FileStore::new(PathBuf::from(storage_path))))
}
