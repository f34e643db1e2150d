//! HS256 JWT verifier and session-token issuer.
//!
//! Verifies bearer tokens signed with a shared secret and mints the
//! session tokens returned by the login endpoint. The `sub` claim carries
//! the subject identifier; an optional `admin` claim carries the elevated
//! access flag.

use crate::{AuthError, AuthFactory, AuthInterface, AuthRegistry, Claims};
use async_trait::async_trait;
use colada_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default session-token lifetime: one day.
const DEFAULT_SESSION_TTL_SECONDS: i64 = 86_400;

/// Claims carried in the signed token.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
	/// Subject identifier.
	sub: String,
	/// Elevated-access flag, present on session tokens.
	#[serde(skip_serializing_if = "Option::is_none")]
	admin: Option<bool>,
	/// Expiry, seconds since the epoch.
	exp: i64,
}

/// HS256 JWT verifier.
pub struct JwtAuth {
	secret: String,
	session_ttl_seconds: i64,
}

impl JwtAuth {
	/// Creates a new verifier with the given shared secret and session TTL.
	pub fn new(secret: String, session_ttl_seconds: i64) -> Self {
		Self {
			secret,
			session_ttl_seconds,
		}
	}
}

#[async_trait]
impl AuthInterface for JwtAuth {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(JwtAuthSchema)
	}

	async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
		let data = decode::<TokenClaims>(
			token,
			&DecodingKey::from_secret(self.secret.as_bytes()),
			&Validation::new(Algorithm::HS256),
		)
		.map_err(|e| AuthError::InvalidToken(e.to_string()))?;

		Ok(Claims {
			subject: data.claims.sub,
			admin: data.claims.admin,
		})
	}

	fn issue_session(&self, client_id: &str, admin: bool) -> Result<String, AuthError> {
		let claims = TokenClaims {
			sub: client_id.to_string(),
			admin: Some(admin),
			exp: chrono::Utc::now().timestamp() + self.session_ttl_seconds,
		};

		encode(
			&Header::new(Algorithm::HS256),
			&claims,
			&EncodingKey::from_secret(self.secret.as_bytes()),
		)
		.map_err(|e| AuthError::Implementation(e.to_string()))
	}
}

/// Configuration schema for JwtAuth.
pub struct JwtAuthSchema;

impl ConfigSchema for JwtAuthSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("secret", FieldType::String)],
			vec![Field::new(
				"session_ttl_seconds",
				FieldType::Integer {
					min: Some(60),
					max: None,
				},
			)],
		);
		schema.validate(config)
	}
}

/// Registry for the JWT auth implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "jwt";
	type Factory = AuthFactory;

	fn factory() -> Self::Factory {
		create_auth
	}
}

impl AuthRegistry for Registry {}

/// Factory function to create a JWT verifier from configuration.
///
/// Configuration parameters:
/// - `secret`: shared HS256 secret (required)
/// - `session_ttl_seconds`: session-token lifetime (default: 86400)
pub fn create_auth(config: &toml::Value) -> Result<Box<dyn AuthInterface>, AuthError> {
	let secret = config
		.get("secret")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AuthError::Configuration("jwt verifier requires 'secret'".into()))?
		.to_string();

	let session_ttl_seconds = config
		.get("session_ttl_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(DEFAULT_SESSION_TTL_SECONDS);

	Ok(Box::new(JwtAuth::new(secret, session_ttl_seconds)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn session_token_roundtrip() {
		let auth = JwtAuth::new("super-secret".to_string(), 3600);

		let token = auth.issue_session("client-1", true).unwrap();
		let claims = auth.verify(&token).await.unwrap();

		assert_eq!(claims.subject, "client-1");
		assert_eq!(claims.admin, Some(true));
	}

	#[tokio::test]
	async fn wrong_secret_is_rejected() {
		let issuer = JwtAuth::new("secret-a".to_string(), 3600);
		let verifier = JwtAuth::new("secret-b".to_string(), 3600);

		let token = issuer.issue_session("client-1", false).unwrap();
		assert!(matches!(
			verifier.verify(&token).await,
			Err(AuthError::InvalidToken(_))
		));
	}

	#[tokio::test]
	async fn expired_token_is_rejected() {
		// Negative TTL puts the expiry in the past.
		let auth = JwtAuth::new("super-secret".to_string(), -3600);

		let token = auth.issue_session("client-1", false).unwrap();
		assert!(matches!(
			auth.verify(&token).await,
			Err(AuthError::InvalidToken(_))
		));
	}

	#[tokio::test]
	async fn garbage_token_is_rejected() {
		let auth = JwtAuth::new("super-secret".to_string(), 3600);
		assert!(auth.verify("not-a-jwt").await.is_err());
	}
}
