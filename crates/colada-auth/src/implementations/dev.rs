//! Fixed-token verifier for development and tests.
//!
//! Maps literal bearer tokens to subject identifiers from configuration.
//! Session tokens issued by this verifier are plain `session:<id>:<admin>`
//! strings that its own `verify` accepts, so a development stack stays
//! self-consistent without a signing secret.

use crate::{AuthError, AuthFactory, AuthInterface, AuthRegistry, Claims};
use async_trait::async_trait;
use colada_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;

/// Fixed token-map verifier.
pub struct DevAuth {
	/// Literal token -> subject identifier.
	tokens: HashMap<String, String>,
}

impl DevAuth {
	/// Creates a new verifier over the given token map.
	pub fn new(tokens: HashMap<String, String>) -> Self {
		Self { tokens }
	}
}

#[async_trait]
impl AuthInterface for DevAuth {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(DevAuthSchema)
	}

	async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
		// Self-issued session tokens
		if let Some(rest) = token.strip_prefix("session:") {
			let (client_id, admin) = rest
				.rsplit_once(':')
				.ok_or_else(|| AuthError::InvalidToken("malformed session token".into()))?;
			let admin = admin
				.parse::<bool>()
				.map_err(|_| AuthError::InvalidToken("malformed session token".into()))?;
			return Ok(Claims {
				subject: client_id.to_string(),
				admin: Some(admin),
			});
		}

		self.tokens
			.get(token)
			.map(|subject| Claims {
				subject: subject.clone(),
				admin: None,
			})
			.ok_or_else(|| AuthError::InvalidToken("unknown token".into()))
	}

	fn issue_session(&self, client_id: &str, admin: bool) -> Result<String, AuthError> {
		Ok(format!("session:{}:{}", client_id, admin))
	}
}

/// Configuration schema for DevAuth.
pub struct DevAuthSchema;

impl ConfigSchema for DevAuthSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("tokens", FieldType::Table)]);
		schema.validate(config)
	}
}

/// Registry for the dev auth implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "dev";
	type Factory = AuthFactory;

	fn factory() -> Self::Factory {
		create_auth
	}
}

impl AuthRegistry for Registry {}

/// Factory function to create a dev verifier from configuration.
///
/// Configuration parameters:
/// - `tokens`: table mapping literal bearer tokens to subject identifiers
pub fn create_auth(config: &toml::Value) -> Result<Box<dyn AuthInterface>, AuthError> {
	let mut tokens = HashMap::new();

	if let Some(table) = config.get("tokens").and_then(|v| v.as_table()) {
		for (token, subject) in table {
			let subject = subject.as_str().ok_or_else(|| {
				AuthError::Configuration(format!("token '{}' must map to a string subject", token))
			})?;
			tokens.insert(token.clone(), subject.to_string());
		}
	}

	Ok(Box::new(DevAuth::new(tokens)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn auth() -> DevAuth {
		let mut tokens = HashMap::new();
		tokens.insert("token-ana".to_string(), "uid-ana".to_string());
		DevAuth::new(tokens)
	}

	#[tokio::test]
	async fn known_token_maps_to_subject() {
		let claims = auth().verify("token-ana").await.unwrap();
		assert_eq!(claims.subject, "uid-ana");
		assert_eq!(claims.admin, None);
	}

	#[tokio::test]
	async fn unknown_token_is_rejected() {
		assert!(auth().verify("nope").await.is_err());
	}

	#[tokio::test]
	async fn session_roundtrip() {
		let auth = auth();
		let token = auth.issue_session("client-7", true).unwrap();
		let claims = auth.verify(&token).await.unwrap();
		assert_eq!(claims.subject, "client-7");
		assert_eq!(claims.admin, Some(true));
	}
}
