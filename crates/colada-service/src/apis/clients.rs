//! Client endpoints: CRUD, login merge and per-client statistics.

use crate::extract::{AuthClaims, Caller, RequireAdmin, ValidatedJson};
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use colada_types::{
	ApiError, Client, ClientStatsResponse, CreateClientRequest, LoginRequest, LoginResponse,
	SuccessResponse, UpdateClientRequest,
};

/// Handles POST /clients requests.
///
/// Creates a client owned by the caller's subject identifier.
pub async fn create_client(
	State(state): State<AppState>,
	caller: Caller,
	ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
	let client = state
		.engine
		.clients()
		.create(&caller.subject, request)
		.await?;
	Ok((StatusCode::CREATED, Json(client)))
}

/// Handles GET /clients requests. Admin only.
pub async fn list_clients(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Client>>, ApiError> {
	Ok(Json(state.engine.clients().list().await?))
}

/// Handles GET /clients/{id} requests. Owner or admin.
pub async fn get_client(
	State(state): State<AppState>,
	caller: Caller,
	Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
	if !caller.admin && !caller.owns_client(&id) {
		return Err(ApiError::Forbidden(
			"You can only view your own profile".to_string(),
		));
	}
	Ok(Json(state.engine.clients().get(&id).await?))
}

/// Handles PUT /clients/{id} requests. Owner or admin; only an admin can
/// change the admin flag.
pub async fn update_client(
	State(state): State<AppState>,
	caller: Caller,
	Path(id): Path<String>,
	ValidatedJson(request): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, ApiError> {
	if !caller.admin && !caller.owns_client(&id) {
		return Err(ApiError::Forbidden(
			"You can only update your own profile".to_string(),
		));
	}
	let client = state
		.engine
		.clients()
		.update(&id, request, caller.admin)
		.await?;
	Ok(Json(client))
}

/// Handles DELETE /clients/{id} requests. Admin only.
pub async fn delete_client(
	State(state): State<AppState>,
	RequireAdmin(_): RequireAdmin,
	Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
	state.engine.clients().delete(&id).await?;
	Ok(Json(SuccessResponse::ok()))
}

/// Handles POST /clients/login requests.
///
/// Runs the identity merge for the verified subject and returns the
/// resolved client together with a session token embedding its id and
/// admin flag.
pub async fn login(
	State(state): State<AppState>,
	claims: AuthClaims,
	ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
	let (user, access_token) = state
		.engine
		.login(
			&claims.subject,
			request.telefono.as_deref(),
			request.nombre.as_deref(),
		)
		.await?;

	Ok(Json(LoginResponse { access_token, user }))
}

/// Handles GET /clients/{id}/stats requests. Owner or admin.
pub async fn client_stats(
	State(state): State<AppState>,
	caller: Caller,
	Path(id): Path<String>,
) -> Result<Json<ClientStatsResponse>, ApiError> {
	if !caller.admin && !caller.owns_client(&id) {
		return Err(ApiError::Forbidden(
			"You can only view your own statistics".to_string(),
		));
	}
	Ok(Json(state.engine.clients().stats(&id).await?))
}
