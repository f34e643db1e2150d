//! HTTP server for the colada API.
//!
//! Builds the axum router over the engine and serves the full surface:
//! client CRUD and login, order CRUD with state transitions, the aggregate
//! dashboards, and the unauthenticated public projection.

use crate::apis;
use axum::{
	routing::{get, post},
	Router,
};
use colada_config::ApiConfig;
use colada_core::ColadaEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine for processing requests.
	pub engine: Arc<ColadaEngine>,
}

/// Builds the API router over the given engine.
pub fn build_router(engine: Arc<ColadaEngine>) -> Router {
	let state = AppState { engine };

	Router::new()
		.route(
			"/clients",
			post(apis::clients::create_client).get(apis::clients::list_clients),
		)
		.route("/clients/login", post(apis::clients::login))
		.route(
			"/clients/{id}",
			get(apis::clients::get_client)
				.put(apis::clients::update_client)
				.delete(apis::clients::delete_client),
		)
		.route("/clients/{id}/stats", get(apis::clients::client_stats))
		.route(
			"/ventas",
			post(apis::ventas::create_venta).get(apis::ventas::list_ventas),
		)
		.route("/ventas/count", get(apis::ventas::count_ventas))
		.route("/ventas/stats", get(apis::ventas::ventas_stats))
		.route("/ventas/imprimiendo", get(apis::ventas::ventas_imprimiendo))
		.route(
			"/ventas/{id}",
			get(apis::ventas::get_venta)
				.put(apis::ventas::update_venta)
				.delete(apis::ventas::delete_venta),
		)
		.route("/public/ventas/{id}", get(apis::publico::public_venta))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<ColadaEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("colada API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use chrono::Utc;
	use colada_core::{ColadaBuilder, ColadaFactories};
	use colada_types::{Client, Collection};
	use serde_json::{json, Value};
	use tower::ServiceExt;

	async fn test_engine() -> Arc<ColadaEngine> {
		let config = r#"
[service]
id = "colada-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[auth]
primary = "dev"
[auth.implementations.dev]
[auth.implementations.dev.tokens]
"token-admin" = "uid-admin"
"token-ana" = "uid-ana"
"#
		.parse()
		.expect("test config parses");

		let factories = ColadaFactories {
			storage_factories: colada_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			auth_factories: colada_auth::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			notifier_factories: colada_notify::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		};

		let engine = Arc::new(
			ColadaBuilder::new(config)
				.build(factories)
				.expect("engine builds"),
		);

		// Seed the operator account.
		let now = Utc::now();
		let admin = Client {
			id: "uid-admin".to_string(),
			nombre: "Operadora".to_string(),
			telefono: None,
			firebase_uid: Some("uid-admin".to_string()),
			admin: true,
			created_at: now,
			updated_at: now,
		};
		engine
			.storage()
			.store(Collection::Clients.as_str(), &admin.id, &admin)
			.await
			.expect("seed admin");

		engine
	}

	fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
		let mut builder = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			builder = builder.header("authorization", format!("Bearer {}", token));
		}
		match body {
			Some(body) => builder
				.header("content-type", "application/json")
				.body(Body::from(body.to_string()))
				.expect("request builds"),
			None => builder.body(Body::empty()).expect("request builds"),
		}
	}

	async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
		let response = app.clone().oneshot(req).await.expect("request handled");
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX)
			.await
			.expect("body reads");
		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).expect("body is JSON")
		};
		(status, body)
	}

	#[tokio::test]
	async fn end_to_end_order_flow() {
		let app = build_router(test_engine().await);

		// Create an order by phone; the shadow client appears on the fly.
		let (status, body) = send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-admin"),
				Some(json!({
					"telefono": "600111222",
					"nombre": "Ana",
					"coste": {"total": 20}
				})),
			),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);
		let id = body["id"].as_str().expect("created id").to_string();

		// Fresh orders sit in the queue with the full cost recorded.
		let (status, venta) = send(
			&app,
			request("GET", &format!("/ventas/{}", id), Some("token-admin"), None),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(venta["estado_actual"], 1);
		assert_eq!(venta["coste"]["total"], 20);

		// Transition to washing.
		let (status, body) = send(
			&app,
			request(
				"PUT",
				&format!("/ventas/{}", id),
				Some("token-admin"),
				Some(json!({"estado_actual": 2})),
			),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["success"], true);

		// The queue occupancy is closed, the washing one open.
		let (_, venta) = send(
			&app,
			request("GET", &format!("/ventas/{}", id), Some("token-admin"), None),
		)
		.await;
		assert_eq!(venta["estado_actual"], 2);
		let historial = venta["historial_estados"].as_array().expect("history");
		assert_eq!(historial.len(), 2);
		assert_eq!(historial[0]["estado"], 1);
		assert!(historial[0]["salida"].is_string());
		assert_eq!(historial[1]["estado"], 2);
		assert!(historial[1].get("salida").is_none());
	}

	#[tokio::test]
	async fn count_reports_every_state() {
		let app = build_router(test_engine().await);

		send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-admin"),
				Some(json!({
					"telefono": "600111222",
					"nombre": "Ana",
					"coste": {"total": 10}
				})),
			),
		)
		.await;

		let (status, counts) = send(
			&app,
			request("GET", "/ventas/count", Some("token-admin"), None),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		let counts = counts.as_object().expect("count map");
		assert_eq!(counts.len(), 5);
		assert_eq!(counts["1"], 1);
		for key in ["0", "2", "3", "4"] {
			assert_eq!(counts[key], 0);
		}
	}

	#[tokio::test]
	async fn auth_failures_map_to_401_and_403() {
		let app = build_router(test_engine().await);

		let (status, body) = send(&app, request("GET", "/ventas", None, None)).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error"], "UNAUTHORIZED");

		// A known but non-admin subject cannot create orders.
		let (status, body) = send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-ana"),
				Some(json!({
					"telefono": "600111222",
					"nombre": "Ana",
					"coste": {"total": 10}
				})),
			),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);
		assert_eq!(body["error"], "FORBIDDEN");
	}

	#[tokio::test]
	async fn malformed_body_is_a_400_validation_error() {
		let app = build_router(test_engine().await);

		// coste.total missing
		let (status, body) = send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-admin"),
				Some(json!({"telefono": "600", "nombre": "Ana", "coste": {}})),
			),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}

	#[tokio::test]
	async fn missing_venta_is_a_404() {
		let app = build_router(test_engine().await);

		let (status, body) = send(
			&app,
			request("GET", "/ventas/nope", Some("token-admin"), None),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "NOT_FOUND");
	}

	#[tokio::test]
	async fn public_projection_is_redacted() {
		let app = build_router(test_engine().await);

		let (_, body) = send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-admin"),
				Some(json!({
					"telefono": "600111222",
					"nombre": "Ana López",
					"coste": {"total": 20}
				})),
			),
		)
		.await;
		let id = body["id"].as_str().expect("created id").to_string();

		// No token needed.
		let (status, publica) = send(
			&app,
			request("GET", &format!("/public/ventas/{}", id), None, None),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(publica["alias"], "Ana L.");
		assert_eq!(publica["coste"]["total"], 20);
		assert_eq!(publica["estado_actual"], 1);
		assert!(publica.get("telefono").is_none());
		assert!(publica.get("nombre").is_none());
		assert!(publica.get("client_id").is_none());
	}

	#[tokio::test]
	async fn login_merges_and_returns_session_token() {
		let app = build_router(test_engine().await);

		// An order by phone creates the shadow record first.
		send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-admin"),
				Some(json!({
					"telefono": "600111222",
					"nombre": "Ana",
					"coste": {"total": 20}
				})),
			),
		)
		.await;

		// Ana logs in with her phone: the shadow is claimed.
		let (status, body) = send(
			&app,
			request(
				"POST",
				"/clients/login",
				Some("token-ana"),
				Some(json!({"telefono": "600111222"})),
			),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["user"]["firebase_uid"], "uid-ana");
		let session = body["access_token"].as_str().expect("session token");

		// The session token authenticates follow-up requests.
		let client_id = body["user"]["id"].as_str().expect("client id");
		let (status, ventas) = send(
			&app,
			request("GET", "/ventas", Some(session), None),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		let ventas = ventas.as_array().expect("order list");
		assert_eq!(ventas.len(), 1);
		assert_eq!(ventas[0]["client_id"], client_id);
	}

	#[tokio::test]
	async fn imprimiendo_list_is_open_and_current() {
		let app = build_router(test_engine().await);

		let (_, body) = send(
			&app,
			request(
				"POST",
				"/ventas",
				Some("token-admin"),
				Some(json!({
					"telefono": "600111222",
					"nombre": "Ana",
					"coste": {"total": 20}
				})),
			),
		)
		.await;
		let id = body["id"].as_str().expect("created id").to_string();

		let (status, list) = send(&app, request("GET", "/ventas/imprimiendo", None, None)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(list.as_array().expect("list").len(), 1);

		// Once picked up it drops off the board.
		send(
			&app,
			request(
				"PUT",
				&format!("/ventas/{}", id),
				Some("token-admin"),
				Some(json!({"estado_actual": 4})),
			),
		)
		.await;
		let (_, list) = send(&app, request("GET", "/ventas/imprimiendo", None, None)).await;
		assert!(list.as_array().expect("list").is_empty());
	}
}
