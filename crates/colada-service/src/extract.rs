//! Axum extractors for authentication and request validation.
//!
//! Handlers declare what they need (a verified caller, an admin, a
//! validated JSON body) and the extractors turn failures into the
//! structured error responses of the API taxonomy before any handler code
//! runs.

use crate::server::AppState;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use colada_types::{ApiError, Client};
use serde::de::DeserializeOwned;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let auth_header = parts
			.headers
			.get("authorization")
			.and_then(|value| value.to_str().ok())
			.ok_or_else(|| ApiError::Auth("Authorization header is missing".to_string()))?;

		let token = auth_header
			.strip_prefix("Bearer ")
			.ok_or_else(|| {
				ApiError::Auth("Authorization header must be a Bearer token".to_string())
			})?
			.to_string();

		if token.is_empty() {
			return Err(ApiError::Auth("Empty bearer token".to_string()));
		}

		Ok(Self(token))
	}
}

/// Verified claims from the bearer token, with no client lookup.
///
/// Used by the login endpoint, which runs before a client record may
/// exist.
#[derive(Debug, Clone)]
pub struct AuthClaims {
	/// The verified subject identifier.
	pub subject: String,
}

impl FromRequestParts<AppState> for AuthClaims {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

		let claims = state
			.engine
			.auth()
			.verify(&token)
			.await
			.map_err(|e| ApiError::Auth(e.to_string()))?;

		Ok(Self {
			subject: claims.subject,
		})
	}
}

/// Authenticated caller with their client record resolved.
///
/// The subject of a provider token is matched against claimed records;
/// the subject of a session token is the client id itself. The admin flag
/// comes from the token when present, from the client record otherwise.
#[derive(Debug, Clone)]
pub struct Caller {
	/// The verified subject identifier.
	pub subject: String,
	/// The caller's client record, when one exists.
	pub client: Option<Client>,
	/// Elevated-access flag.
	pub admin: bool,
}

impl Caller {
	/// True when the caller's client record is the given one.
	pub fn owns_client(&self, client_id: &str) -> bool {
		self.client
			.as_ref()
			.is_some_and(|client| client.id == client_id)
	}
}

impl FromRequestParts<AppState> for Caller {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

		let claims = state
			.engine
			.auth()
			.verify(&token)
			.await
			.map_err(|e| ApiError::Auth(e.to_string()))?;

		// Claimed record for provider tokens, id match for session tokens.
		let client = match state.engine.identity().find_by_subject(&claims.subject).await {
			Ok(Some(client)) => Some(client),
			Ok(None) => state
				.engine
				.clients()
				.get(&claims.subject)
				.await
				.ok(),
			Err(e) => return Err(ApiError::from(e)),
		};

		let admin = claims
			.admin
			.unwrap_or_else(|| client.as_ref().is_some_and(|c| c.admin));

		Ok(Self {
			subject: claims.subject,
			client,
			admin,
		})
	}
}

/// Caller with the admin flag enforced. Rejects with 403 otherwise.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Caller);

impl FromRequestParts<AppState> for RequireAdmin {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let caller = Caller::from_request_parts(parts, state).await?;
		if !caller.admin {
			return Err(ApiError::Forbidden("Admins only".to_string()));
		}
		Ok(Self(caller))
	}
}

/// JSON body extractor that reports deserialization problems as
/// field-level validation errors (400) instead of axum's default
/// rejection.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let Json(value) = Json::<T>::from_request(req, state)
			.await
			.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
		Ok(Self(value))
	}
}
