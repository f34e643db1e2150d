//! Unauthenticated public endpoint.
//!
//! Customers follow a link to check their order without logging in. The
//! response is a redacted projection: no phone number, no raw name, no
//! client identifier.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use colada_types::{ApiError, VentaPublica};

/// Handles GET /public/ventas/{id} requests.
pub async fn public_venta(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<VentaPublica>, ApiError> {
	let venta = state.engine.ventas().get(&id).await?;
	Ok(Json(VentaPublica::from(&venta)))
}
