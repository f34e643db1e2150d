//! Main entry point for the colada service.
//!
//! This binary serves the order-tracking API: phone-based identity
//! resolution, the order lifecycle state machine, aggregate dashboards and
//! the broadcast side channel. It uses a modular architecture with
//! pluggable implementations for storage, token verification and
//! notification delivery.

use clap::Parser;
use colada_config::Config;
use colada_core::{ColadaBuilder, ColadaEngine, ColadaFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod extract;
mod server;

/// Command-line arguments for the colada service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the colada service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with all implementations
/// 5. Runs the notification dispatcher and the API server until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started colada");

	// Load configuration
	let config = Config::from_file(
		args.config
			.to_str()
			.ok_or("configuration path is not valid UTF-8")?,
	)
	.await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let api_config = config.api.clone();

	// Build the engine with implementations
	let engine = Arc::new(build_engine(config)?);

	// Run the notification dispatcher and the API server concurrently
	let dispatcher = engine.run();
	let api = server::start_server(api_config, Arc::clone(&engine));

	tokio::select! {
		result = dispatcher => {
			tracing::info!("Dispatcher finished");
			result?;
		}
		result = api => {
			tracing::info!("API server finished");
			result?;
		}
	}

	tracing::info!("Stopped colada");
	Ok(())
}

/// Builds the engine with all registered implementations.
///
/// Each pluggable crate exposes its implementations through a registry;
/// the builder picks the ones the configuration names.
fn build_engine(config: Config) -> Result<ColadaEngine, Box<dyn std::error::Error>> {
	let factories = ColadaFactories {
		storage_factories: colada_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		auth_factories: colada_auth::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		notifier_factories: colada_notify::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	};

	Ok(ColadaBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[tokio::test]
	async fn test_build_engine_from_file_config() {
		let temp_dir = tempdir().expect("Failed to create temp dir");
		let config_path = temp_dir.path().join("test_config.toml");

		let config_content = r#"
[service]
id = "colada-file-test"

[api]
host = "127.0.0.1"
port = 8099

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data"

[auth]
primary = "jwt"
[auth.implementations.jwt]
secret = "test-secret"
"#;

		std::fs::write(&config_path, config_content).expect("Failed to write config");

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.expect("Failed to load config");
		assert_eq!(config.service.id, "colada-file-test");
		assert_eq!(config.api.port, 8099);

		let engine = build_engine(config).expect("Failed to build engine");
		assert_eq!(engine.config().service.id, "colada-file-test");
	}

	#[test]
	fn test_every_registry_has_implementations() {
		assert!(!colada_storage::get_all_implementations().is_empty());
		assert!(!colada_auth::get_all_implementations().is_empty());
		assert!(!colada_notify::get_all_implementations().is_empty());
	}
}
