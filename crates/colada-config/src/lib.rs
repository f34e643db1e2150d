//! Configuration module for the colada system.
//!
//! This module provides structures and utilities for managing service
//! configuration. It supports loading configuration from TOML files with
//! environment-variable interpolation, and validates that every section is
//! coherent before anything is wired up. The configuration is constructed
//! explicitly at process start and handed to the engine builder; there is
//! no global store handle.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the colada service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	pub service: ServiceConfig,
	/// Configuration for the HTTP API server.
	#[serde(default)]
	pub api: ApiConfig,
	/// Configuration for the document-store backend.
	pub storage: StorageConfig,
	/// Configuration for the token verifier.
	pub auth: AuthConfig,
	/// Configuration for notification sinks. Absent means mutations are
	/// not broadcast anywhere.
	pub notifier: Option<NotifierConfig>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance.
	pub id: String,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

/// Configuration for the document-store backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the token verifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of verifier implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for notification sinks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
	/// Map of sink implementation names to their configurations. Every
	/// configured sink receives every broadcast.
	pub implementations: HashMap<String, toml::Value>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable
/// VAR_NAME. Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).expect("capture 0 always present");
		let var_name = cap.get(1).expect("var name group").as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)))
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		raw.parse()
	}

	/// Validates the configuration.
	///
	/// - the service id must be non-empty
	/// - the primary storage and auth implementations must be configured
	/// - a notifier section, when present, must configure at least one sink
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if self.auth.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Auth primary implementation cannot be empty".into(),
			));
		}
		if !self.auth.implementations.contains_key(&self.auth.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary auth '{}' not found in implementations",
				self.auth.primary
			)));
		}

		if let Some(ref notifier) = self.notifier {
			if notifier.implementations.is_empty() {
				return Err(ConfigError::Validation(
					"Notifier section present but no sink configured".into(),
				));
			}
		}

		if self.api.port == 0 {
			return Err(ConfigError::Validation("API port cannot be 0".into()));
		}

		Ok(())
	}
}

/// Implementation of FromStr for Config.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[service]
id = "colada-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[auth]
primary = "dev"
[auth.implementations.dev]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("COLADA_TEST_HOST", "localhost");
		std::env::set_var("COLADA_TEST_PORT", "5432");

		let input = "host = \"${COLADA_TEST_HOST}:${COLADA_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("COLADA_TEST_HOST");
		std::env::remove_var("COLADA_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${COLADA_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${COLADA_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("COLADA_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_parses_with_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.service.id, "colada-test");
		assert_eq!(config.api.host, "127.0.0.1");
		assert_eq!(config.api.port, 8080);
		assert!(config.notifier.is_none());
	}

	#[test]
	fn test_unconfigured_primary_rejected() {
		let config_str = r#"
[service]
id = "colada-test"

[storage]
primary = "redis"
[storage.implementations.memory]

[auth]
primary = "dev"
[auth.implementations.dev]
"#;
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("redis"));
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let config_str = MINIMAL.replace("colada-test", "");
		assert!(config_str.parse::<Config>().is_err());
	}

	#[test]
	fn test_empty_notifier_section_rejected() {
		let config_str = format!("{}\n[notifier]\n[notifier.implementations]\n", MINIMAL);
		assert!(config_str.parse::<Config>().is_err());
	}

	#[test]
	fn test_full_config_with_env_vars() {
		std::env::set_var("COLADA_TEST_SECRET", "s3cret");

		let config_str = r#"
[service]
id = "colada-dev"

[api]
host = "0.0.0.0"
port = 9090

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data"

[auth]
primary = "jwt"
[auth.implementations.jwt]
secret = "${COLADA_TEST_SECRET}"

[notifier]
[notifier.implementations.webhook]
url = "${COLADA_WS_URL:-http://websockets:3001}/broadcast"
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.api.port, 9090);
		let jwt = &config.auth.implementations["jwt"];
		assert_eq!(jwt.get("secret").unwrap().as_str().unwrap(), "s3cret");
		let webhook = &config.notifier.unwrap().implementations["webhook"];
		assert_eq!(
			webhook.get("url").unwrap().as_str().unwrap(),
			"http://websockets:3001/broadcast"
		);

		std::env::remove_var("COLADA_TEST_SECRET");
	}
}
