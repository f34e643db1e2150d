//! Order endpoints: CRUD, state transitions and aggregate queries.

use crate::extract::{Caller, RequireAdmin, ValidatedJson};
use crate::server::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use colada_types::{
	ApiError, CreateVentaRequest, CreatedResponse, DailyStatsResponse, SuccessResponse,
	UpdateVentaRequest, Venta,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Query parameters for GET /ventas.
#[derive(Debug, Default, Deserialize)]
pub struct VentasQuery {
	pub client_id: Option<String>,
}

/// Handles POST /ventas requests. Admin only.
///
/// Resolves the owning client from the phone number when no client_id is
/// supplied, creating a shadow client on first contact.
pub async fn create_venta(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
	ValidatedJson(request): ValidatedJson<CreateVentaRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
	let venta = state.engine.create_venta(request).await?;
	Ok((StatusCode::CREATED, Json(CreatedResponse { id: venta.id })))
}

/// Handles GET /ventas requests.
///
/// Admins see everything, optionally filtered by client; other callers
/// only ever see their own orders.
pub async fn list_ventas(
	State(state): State<AppState>,
	caller: Caller,
	Query(query): Query<VentasQuery>,
) -> Result<Json<Vec<Venta>>, ApiError> {
	if caller.admin {
		let ventas = state.engine.ventas().list(query.client_id.as_deref()).await?;
		return Ok(Json(ventas));
	}

	let own = caller.client.as_ref().ok_or_else(|| {
		ApiError::Forbidden("No client profile for this subject".to_string())
	})?;
	if let Some(ref requested) = query.client_id {
		if requested != &own.id {
			return Err(ApiError::Forbidden(
				"You can only list your own orders".to_string(),
			));
		}
	}
	let ventas = state.engine.ventas().list(Some(&own.id)).await?;
	Ok(Json(ventas))
}

/// Handles GET /ventas/{id} requests. Owner or admin.
pub async fn get_venta(
	State(state): State<AppState>,
	caller: Caller,
	Path(id): Path<String>,
) -> Result<Json<Venta>, ApiError> {
	let venta = state.engine.ventas().get(&id).await?;
	if !caller.admin && !caller.owns_client(&venta.client_id) {
		return Err(ApiError::Forbidden(
			"You can only view your own orders".to_string(),
		));
	}
	Ok(Json(venta))
}

/// Handles PUT /ventas/{id} requests. Admin only.
///
/// This is the state-transition operation; it also applies any other
/// supplied fields verbatim.
pub async fn update_venta(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
	Path(id): Path<String>,
	ValidatedJson(request): ValidatedJson<UpdateVentaRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
	state.engine.ventas().update(&id, request).await?;
	Ok(Json(SuccessResponse::ok()))
}

/// Handles DELETE /ventas/{id} requests. Admin only.
pub async fn delete_venta(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
	Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
	state.engine.ventas().delete(&id).await?;
	Ok(Json(SuccessResponse::ok()))
}

/// Handles GET /ventas/count requests. Admin only.
///
/// Every enumerated state appears in the response, zeroes included.
pub async fn count_ventas(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
) -> Result<Json<BTreeMap<String, u64>>, ApiError> {
	Ok(Json(state.engine.ventas().count_by_estado().await?))
}

/// Handles GET /ventas/stats requests. Admin only.
pub async fn ventas_stats(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
) -> Result<Json<DailyStatsResponse>, ApiError> {
	Ok(Json(state.engine.ventas().daily_stats().await?))
}

/// Handles GET /ventas/imprimiendo requests.
///
/// Unauthenticated: this is the broadcast source the websocket relay and
/// the shop display poll.
pub async fn ventas_imprimiendo(
	State(state): State<AppState>,
) -> Result<Json<Vec<Venta>>, ApiError> {
	Ok(Json(state.engine.ventas().in_progress().await?))
}
