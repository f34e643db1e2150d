//! Notification sink module for the colada system.
//!
//! After any order mutation the current in-progress order list is pushed to
//! an external broadcast endpoint. Delivery is strictly best-effort: a sink
//! failure is logged and swallowed, and the primary write path never sees
//! it. This module provides the sink seam and an HTTP webhook
//! implementation.

use async_trait::async_trait;
use colada_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod webhook;
}

/// Errors that can occur during notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when serializing the payload.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for notification sinks.
///
/// A sink receives the serialized in-progress order list after every order
/// mutation. Implementations must not retry indefinitely or block beyond
/// their own request timeout; the caller treats every push as
/// fire-and-forget.
#[async_trait]
pub trait NotifierInterface: Send + Sync {
	/// Returns the configuration schema for this sink implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Pushes a payload to the sink.
	async fn push(&self, payload: &serde_json::Value) -> Result<(), NotifyError>;
}

/// Type alias for notifier factory functions.
pub type NotifierFactory = fn(&toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError>;

/// Registry trait for notifier implementations.
pub trait NotifierRegistry: ImplementationRegistry<Factory = NotifierFactory> {}

/// Get all registered notifier implementations.
pub fn get_all_implementations() -> Vec<(&'static str, NotifierFactory)> {
	use implementations::webhook;

	vec![(webhook::Registry::NAME, webhook::Registry::factory())]
}

/// Service that fans a payload out to every configured sink.
///
/// Failures are logged at warn level and swallowed; `broadcast` never
/// returns an error.
pub struct NotifierService {
	/// The configured sinks, each paired with its configuration name.
	sinks: Vec<(String, Box<dyn NotifierInterface>)>,
}

impl NotifierService {
	/// Creates a new NotifierService over the given sinks.
	pub fn new(sinks: Vec<(String, Box<dyn NotifierInterface>)>) -> Self {
		Self { sinks }
	}

	/// Creates a service with no sinks; broadcasts become no-ops.
	pub fn disabled() -> Self {
		Self { sinks: Vec::new() }
	}

	/// True when at least one sink is configured.
	pub fn is_enabled(&self) -> bool {
		!self.sinks.is_empty()
	}

	/// Pushes the payload to every sink, best-effort.
	pub async fn broadcast(&self, payload: &serde_json::Value) {
		for (name, sink) in &self.sinks {
			if let Err(e) = sink.push(payload).await {
				tracing::warn!(sink = %name, error = %e, "Broadcast push failed");
			}
		}
	}
}
