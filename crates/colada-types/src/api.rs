//! API types for the colada HTTP surface.
//!
//! Request and response bodies for the client and order endpoints, plus the
//! structured error taxonomy every handler maps into.

use crate::{Client, Coste, EstadoVenta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for `POST /clients`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClientRequest {
	pub nombre: String,
	#[serde(default)]
	pub telefono: Option<String>,
}

/// Request body for `PUT /clients/{id}`. Partial update: only supplied
/// fields change. The claim (`firebase_uid`) is deliberately not updatable
/// through this surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClientRequest {
	#[serde(default)]
	pub nombre: Option<String>,
	#[serde(default)]
	pub telefono: Option<String>,
	/// Only honored for admin callers.
	#[serde(default)]
	pub admin: Option<bool>,
}

/// Request body for `POST /clients/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
	/// Phone number to reconcile against shadow records, when known.
	#[serde(default)]
	pub telefono: Option<String>,
	/// Display name for a profile created on first login.
	#[serde(default)]
	pub nombre: Option<String>,
}

/// Response body for `POST /clients/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
	/// Session token embedding the resolved client id and admin flag.
	pub access_token: String,
	pub user: Client,
}

/// Response body for `GET /clients/{id}/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStatsResponse {
	pub client_id: String,
	pub total_ventas: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_purchase_date: Option<DateTime<Utc>>,
}

/// Request body for `POST /ventas`.
///
/// Either `client_id` or `telefono` must be present; when only the phone is
/// given the owning client is resolved through shadow-or-claim lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVentaRequest {
	#[serde(default)]
	pub client_id: Option<String>,
	#[serde(default)]
	pub telefono: Option<String>,
	pub nombre: String,
	pub coste: Coste,
	/// Initial lifecycle state; defaults to the queue.
	#[serde(default)]
	pub estado_actual: Option<EstadoVenta>,
}

/// Request body for `PUT /ventas/{id}`. Partial update semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVentaRequest {
	#[serde(default)]
	pub nombre: Option<String>,
	#[serde(default)]
	pub coste: Option<Coste>,
	#[serde(default)]
	pub estado_actual: Option<EstadoVenta>,
}

/// Response body for resource creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
	pub id: String,
}

/// Response body for plain success acknowledgements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
	pub success: bool,
}

impl SuccessResponse {
	pub fn ok() -> Self {
		Self { success: true }
	}
}

/// Response body for `GET /ventas/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStatsResponse {
	/// Orders created today (local day).
	pub ventas_hoy: u64,
	/// Revenue from today's orders.
	pub ingresos_hoy: i64,
	/// Orders created before today that are not yet in a terminal state.
	pub pendientes_antiguos: u64,
}

/// Structured error payload returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable error code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

/// API error with HTTP status mapping.
///
/// Every store, auth or validation failure is converted into one of these
/// at the request boundary; nothing crosses it as a panic.
#[derive(Debug)]
pub enum ApiError {
	/// Malformed or missing required fields (400).
	Validation(String),
	/// Missing, malformed or rejected bearer token (401).
	Auth(String),
	/// Authenticated but not permitted (403).
	Forbidden(String),
	/// Resource does not exist (404).
	NotFound(String),
	/// Duplicate resource (409).
	Conflict(String),
	/// Store unavailable or any other internal failure (500).
	Internal(String),
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::Validation(_) => 400,
			ApiError::Auth(_) => 401,
			ApiError::Forbidden(_) => 403,
			ApiError::NotFound(_) => 404,
			ApiError::Conflict(_) => 409,
			ApiError::Internal(_) => 500,
		}
	}

	/// Stable error code reported in the response body.
	pub fn code(&self) -> &'static str {
		match self {
			ApiError::Validation(_) => "VALIDATION_ERROR",
			ApiError::Auth(_) => "UNAUTHORIZED",
			ApiError::Forbidden(_) => "FORBIDDEN",
			ApiError::NotFound(_) => "NOT_FOUND",
			ApiError::Conflict(_) => "CONFLICT",
			ApiError::Internal(_) => "INTERNAL_ERROR",
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.code().to_string(),
			message: self.message().to_string(),
		}
	}

	fn message(&self) -> &str {
		match self {
			ApiError::Validation(m)
			| ApiError::Auth(m)
			| ApiError::Forbidden(m)
			| ApiError::NotFound(m)
			| ApiError::Conflict(m)
			| ApiError::Internal(m) => m,
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.code(), self.message())
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
