//! HTTP webhook notification sink.
//!
//! Posts the in-progress order list to a configured broadcast URL as
//! `{"message": [...]}`, the envelope the websocket relay expects. The
//! request carries its own timeout so a dead relay cannot hold a
//! dispatcher task for long.

use crate::{NotifierFactory, NotifierInterface, NotifierRegistry, NotifyError};
use async_trait::async_trait;
use colada_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::time::Duration;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Webhook sink posting JSON payloads to a fixed URL.
pub struct WebhookNotifier {
	url: String,
	client: reqwest::Client,
}

impl WebhookNotifier {
	/// Creates a new webhook sink for the given URL and request timeout.
	pub fn new(url: String, timeout: Duration) -> Result<Self, NotifyError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| NotifyError::Configuration(e.to_string()))?;

		Ok(Self { url, client })
	}
}

#[async_trait]
impl NotifierInterface for WebhookNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WebhookNotifierSchema)
	}

	async fn push(&self, payload: &serde_json::Value) -> Result<(), NotifyError> {
		let body = serde_json::json!({ "message": payload });

		let response = self
			.client
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| NotifyError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(NotifyError::Network(format!(
				"broadcast endpoint returned {}",
				response.status()
			)));
		}

		Ok(())
	}
}

/// Configuration schema for WebhookNotifier.
pub struct WebhookNotifierSchema;

impl ConfigSchema for WebhookNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String)],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Registry for the webhook notifier implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "webhook";
	type Factory = NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotifierRegistry for Registry {}

/// Factory function to create a webhook sink from configuration.
///
/// Configuration parameters:
/// - `url`: broadcast endpoint URL (required)
/// - `timeout_seconds`: request timeout (default: 5)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotifyError::Configuration("webhook sink requires 'url'".into()))?
		.to_string();

	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(WebhookNotifier::new(
		url,
		Duration::from_secs(timeout_seconds),
	)?))
}
