//! Authentication module for the colada system.
//!
//! This module provides the seam to the external identity provider: a
//! bearer token goes in, a verified subject identifier comes out. The
//! provider itself is opaque; implementations exist for HS256 JWTs and for
//! a fixed token map used in development. The same seam issues the session
//! tokens returned by the login endpoint.

use async_trait::async_trait;
use colada_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod dev;
	pub mod jwt;
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
	/// Error that occurs when a token is missing, malformed, expired or
	/// fails verification.
	#[error("Invalid token: {0}")]
	InvalidToken(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Error that occurs in the verifier implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Verified claims extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct Claims {
	/// The authenticated subject identifier.
	pub subject: String,
	/// Elevated-access flag, when the token carries one. Absent means the
	/// caller's client record decides.
	pub admin: Option<bool>,
}

/// Trait defining the interface for token verifier implementations.
///
/// Implementations verify externally issued bearer tokens and mint the
/// session tokens handed back by the login endpoint.
#[async_trait]
pub trait AuthInterface: Send + Sync {
	/// Returns the configuration schema for this verifier implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Verifies a bearer token and returns its claims.
	async fn verify(&self, token: &str) -> Result<Claims, AuthError>;

	/// Issues a session token embedding the resolved client id and admin
	/// flag.
	fn issue_session(&self, client_id: &str, admin: bool) -> Result<String, AuthError>;
}

/// Type alias for auth factory functions.
pub type AuthFactory = fn(&toml::Value) -> Result<Box<dyn AuthInterface>, AuthError>;

/// Registry trait for auth implementations.
pub trait AuthRegistry: ImplementationRegistry<Factory = AuthFactory> {}

/// Get all registered auth implementations.
///
/// Returns a vector of (name, factory) tuples for all available verifier
/// implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AuthFactory)> {
	use implementations::{dev, jwt};

	vec![
		(jwt::Registry::NAME, jwt::Registry::factory()),
		(dev::Registry::NAME, dev::Registry::factory()),
	]
}

/// Service that manages token verification and session issuance.
///
/// This struct provides a high-level interface for authentication,
/// wrapping an underlying verifier implementation.
pub struct AuthService {
	/// The underlying verifier implementation.
	implementation: Box<dyn AuthInterface>,
}

impl AuthService {
	/// Creates a new AuthService with the specified implementation.
	pub fn new(implementation: Box<dyn AuthInterface>) -> Self {
		Self { implementation }
	}

	/// Verifies a bearer token and returns its claims.
	pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
		self.implementation.verify(token).await
	}

	/// Issues a session token for the given client.
	pub fn issue_session(&self, client_id: &str, admin: bool) -> Result<String, AuthError> {
		self.implementation.issue_session(client_id, admin)
	}
}
