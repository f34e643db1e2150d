//! Core engine for the colada order-tracking system.
//!
//! This module wires the identity resolver, the order lifecycle manager
//! and the notification dispatcher together over the document-store and
//! auth seams. The engine is built from configuration through a factory
//! registry, so storage backends, token verifiers and notification sinks
//! are all pluggable.

use colada_auth::{AuthFactory, AuthService};
use colada_config::Config;
use colada_notify::{NotifierFactory, NotifierService};
use colada_storage::{StorageError, StorageFactory, StorageService};
use colada_types::{ApiError, Client, CreateVentaRequest, EstadoVenta, Venta};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

pub mod clients;
pub mod event_bus;
pub mod identity;
pub mod orders;

use clients::ClientDirectory;
use event_bus::EventBus;
use identity::IdentityResolver;
use orders::VentaService;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Malformed or missing input.
	#[error("Validation error: {0}")]
	Validation(String),
	/// A referenced document does not exist.
	#[error("{0}")]
	NotFound(String),
	/// A uniqueness constraint would be violated.
	#[error("{0}")]
	Conflict(String),
	/// The underlying store failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<EngineError> for ApiError {
	fn from(err: EngineError) -> Self {
		match err {
			EngineError::Validation(m) => ApiError::Validation(m),
			EngineError::NotFound(m) => ApiError::NotFound(m),
			EngineError::Conflict(m) => ApiError::Conflict(m),
			EngineError::Config(m) | EngineError::Storage(m) => ApiError::Internal(m),
		}
	}
}

impl From<StorageError> for EngineError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound => EngineError::NotFound("document not found".to_string()),
			other => EngineError::Storage(other.to_string()),
		}
	}
}

/// Main engine orchestrating identity resolution, order lifecycle and
/// notification dispatch.
pub struct ColadaEngine {
	/// Service configuration.
	config: Config,
	/// Storage service shared by all components.
	storage: Arc<StorageService>,
	/// Token verification and session issuance.
	auth: Arc<AuthService>,
	/// Notification sinks for the broadcast side effect.
	notifier: Arc<NotifierService>,
	/// Identity resolution over the clients collection.
	identity: IdentityResolver,
	/// Client CRUD and statistics.
	clients: ClientDirectory,
	/// Order lifecycle management.
	ventas: VentaService,
	/// Event bus connecting mutations to the dispatcher.
	event_bus: EventBus,
}

impl ColadaEngine {
	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the auth service.
	pub fn auth(&self) -> &Arc<AuthService> {
		&self.auth
	}

	/// Returns a reference to the identity resolver.
	pub fn identity(&self) -> &IdentityResolver {
		&self.identity
	}

	/// Returns a reference to the client directory.
	pub fn clients(&self) -> &ClientDirectory {
		&self.clients
	}

	/// Returns a reference to the order service.
	pub fn ventas(&self) -> &VentaService {
		&self.ventas
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Resolves the caller and creates an order.
	///
	/// When the request carries no `client_id`, the owning client is
	/// resolved from the phone number, creating a shadow record if needed.
	pub async fn create_venta(&self, request: CreateVentaRequest) -> Result<Venta, EngineError> {
		let client_id = match request.client_id {
			Some(client_id) => client_id,
			None => {
				let telefono = request.telefono.as_deref().ok_or_else(|| {
					EngineError::Validation(
						"either client_id or telefono is required".to_string(),
					)
				})?;
				self.identity
					.resolve_or_create_shadow(telefono, &request.nombre)
					.await?
			},
		};

		let estado_inicial = request.estado_actual.unwrap_or(EstadoVenta::EnCola);
		self.ventas
			.create(client_id, request.nombre, request.coste, estado_inicial)
			.await
	}

	/// Performs the login merge and issues a session token.
	///
	/// The admin flag embedded in the token comes from the resolved client
	/// record.
	pub async fn login(
		&self,
		subject: &str,
		telefono: Option<&str>,
		nombre: Option<&str>,
	) -> Result<(Client, String), EngineError> {
		let client = self
			.identity
			.merge_on_login(subject, telefono, nombre)
			.await?;

		let token = self
			.auth
			.issue_session(&client.id, client.admin)
			.map_err(|e| EngineError::Config(e.to_string()))?;

		Ok((client, token))
	}

	/// Runs the notification dispatch loop until shutdown.
	///
	/// Every order mutation triggers a push of the current in-progress
	/// list to the configured sinks. Lagging behind only skips
	/// intermediate events; the next push always reflects current state.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut events = self.event_bus.subscribe();

		loop {
			tokio::select! {
				event = events.recv() => {
					match event {
						Ok(event) => {
							tracing::debug!(
								venta_id = %event.venta_id(),
								"Order mutation committed"
							);
							self.push_in_progress().await;
						}
						Err(RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "Notification dispatcher lagged");
							self.push_in_progress().await;
						}
						Err(RecvError::Closed) => break,
					}
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		Ok(())
	}

	/// Pushes the in-progress order list to every sink, best-effort.
	///
	/// Failures end here: they are logged and never reach the mutation
	/// that triggered the push.
	async fn push_in_progress(&self) {
		if !self.notifier.is_enabled() {
			return;
		}

		let list = match self.ventas.in_progress().await {
			Ok(list) => list,
			Err(e) => {
				tracing::warn!(error = %e, "Could not load in-progress list for broadcast");
				return;
			},
		};

		match serde_json::to_value(&list) {
			Ok(payload) => self.notifier.broadcast(&payload).await,
			Err(e) => {
				tracing::warn!(error = %e, "Could not serialize broadcast payload");
			},
		}
	}
}

/// Factory maps for all pluggable implementations.
pub struct ColadaFactories {
	/// Storage backend factories by configuration name.
	pub storage_factories: HashMap<String, StorageFactory>,
	/// Token verifier factories by configuration name.
	pub auth_factories: HashMap<String, AuthFactory>,
	/// Notification sink factories by configuration name.
	pub notifier_factories: HashMap<String, NotifierFactory>,
}

/// Builder for constructing a ColadaEngine with pluggable implementations.
///
/// The builder resolves the configured primary storage backend and token
/// verifier, validates each implementation's configuration block against
/// its own schema, and instantiates every configured notification sink.
pub struct ColadaBuilder {
	config: Config,
}

impl ColadaBuilder {
	/// Creates a new builder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using the provided factories.
	pub fn build(self, factories: ColadaFactories) -> Result<ColadaEngine, EngineError> {
		// Create the storage backend
		let storage_name = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(storage_name)
			.ok_or_else(|| {
				EngineError::Config(format!("Storage '{}' not configured", storage_name))
			})?;
		let storage_factory = factories.storage_factories.get(storage_name).ok_or_else(|| {
			EngineError::Config(format!("No factory for storage '{}'", storage_name))
		})?;
		let storage_backend = storage_factory(storage_config)
			.map_err(|e| EngineError::Config(format!("Failed to create storage: {}", e)))?;
		storage_backend
			.config_schema()
			.validate(storage_config)
			.map_err(|e| {
				EngineError::Config(format!("Invalid storage configuration: {}", e))
			})?;
		let storage = Arc::new(StorageService::new(storage_backend));
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");

		// Create the token verifier
		let auth_name = &self.config.auth.primary;
		let auth_config = self
			.config
			.auth
			.implementations
			.get(auth_name)
			.ok_or_else(|| EngineError::Config(format!("Auth '{}' not configured", auth_name)))?;
		let auth_factory = factories
			.auth_factories
			.get(auth_name)
			.ok_or_else(|| EngineError::Config(format!("No factory for auth '{}'", auth_name)))?;
		let auth_impl = auth_factory(auth_config)
			.map_err(|e| EngineError::Config(format!("Failed to create auth: {}", e)))?;
		auth_impl.config_schema().validate(auth_config).map_err(|e| {
			EngineError::Config(format!("Invalid auth configuration: {}", e))
		})?;
		let auth = Arc::new(AuthService::new(auth_impl));
		tracing::info!(component = "auth", implementation = %auth_name, "Loaded");

		// Create notification sinks; a broken sink is skipped, not fatal
		let mut sinks = Vec::new();
		if let Some(ref notifier_config) = self.config.notifier {
			for (name, sink_config) in &notifier_config.implementations {
				let Some(factory) = factories.notifier_factories.get(name) else {
					tracing::error!(
						component = "notifier",
						implementation = %name,
						"No factory for notification sink, skipping"
					);
					continue;
				};
				match factory(sink_config) {
					Ok(sink) => match sink.config_schema().validate(sink_config) {
						Ok(_) => {
							sinks.push((name.clone(), sink));
							tracing::info!(component = "notifier", implementation = %name, "Loaded");
						},
						Err(e) => {
							tracing::error!(
								component = "notifier",
								implementation = %name,
								error = %e,
								"Invalid configuration for notification sink, skipping"
							);
						},
					},
					Err(e) => {
						tracing::error!(
							component = "notifier",
							implementation = %name,
							error = %e,
							"Failed to create notification sink, skipping"
						);
					},
				}
			}
			if sinks.is_empty() {
				tracing::warn!("No notification sinks available - order mutations will not be broadcast");
			}
		}
		let notifier = Arc::new(NotifierService::new(sinks));

		let event_bus = EventBus::new(256);
		let identity = IdentityResolver::new(storage.clone());
		let clients = ClientDirectory::new(storage.clone());
		let ventas = VentaService::new(storage.clone(), event_bus.clone());

		Ok(ColadaEngine {
			config: self.config,
			storage,
			auth,
			notifier,
			identity,
			clients,
			ventas,
			event_bus,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use colada_types::Coste;

	fn test_config() -> Config {
		r#"
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
"#
		.parse()
		.expect("test config parses")
	}

	fn factories() -> ColadaFactories {
		ColadaFactories {
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
		}
	}

	fn engine() -> ColadaEngine {
		ColadaBuilder::new(test_config())
			.build(factories())
			.expect("engine builds")
	}

	#[tokio::test]
	async fn build_wires_configured_implementations() {
		let engine = engine();
		assert_eq!(engine.config().service.id, "colada-test");

		// The dev verifier from config accepts its configured token.
		let claims = engine.auth().verify("token-admin").await.unwrap();
		assert_eq!(claims.subject, "uid-admin");
	}

	#[tokio::test]
	async fn build_rejects_unknown_primary() {
		let mut config = test_config();
		config.storage.primary = "redis".to_string();
		let result = ColadaBuilder::new(config).build(factories());
		assert!(matches!(result, Err(EngineError::Config(_))));
	}

	#[tokio::test]
	async fn create_venta_resolves_shadow_client_from_phone() {
		let engine = engine();

		let request = CreateVentaRequest {
			client_id: None,
			telefono: Some("600111222".to_string()),
			nombre: "Ana".to_string(),
			coste: Coste {
				lavadora: None,
				secadora: None,
				total: 20,
			},
			estado_actual: None,
		};
		let venta = engine.create_venta(request).await.unwrap();

		assert_eq!(venta.estado_actual, EstadoVenta::EnCola);
		let owner = engine
			.identity()
			.find_by_phone("600111222")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(owner.id, venta.client_id);
		assert!(owner.is_shadow());
	}

	#[tokio::test]
	async fn create_venta_requires_some_owner_handle() {
		let engine = engine();

		let request = CreateVentaRequest {
			client_id: None,
			telefono: None,
			nombre: "Ana".to_string(),
			coste: Coste {
				lavadora: None,
				secadora: None,
				total: 20,
			},
			estado_actual: None,
		};
		assert!(matches!(
			engine.create_venta(request).await,
			Err(EngineError::Validation(_))
		));
	}

	#[tokio::test]
	async fn login_returns_session_token_with_admin_flag() {
		let engine = engine();

		let (client, token) = engine
			.login("uid-ana", Some("600111222"), Some("Ana"))
			.await
			.unwrap();
		assert!(client.is_claimed_by("uid-ana"));

		// The dev verifier round-trips its own session tokens.
		let claims = engine.auth().verify(&token).await.unwrap();
		assert_eq!(claims.subject, client.id);
		assert_eq!(claims.admin, Some(false));
	}

	#[tokio::test]
	async fn engine_error_maps_to_api_status() {
		assert_eq!(
			ApiError::from(EngineError::NotFound("x".into())).status_code(),
			404
		);
		assert_eq!(
			ApiError::from(EngineError::Conflict("x".into())).status_code(),
			409
		);
		assert_eq!(
			ApiError::from(EngineError::Validation("x".into())).status_code(),
			400
		);
		assert_eq!(
			ApiError::from(EngineError::Storage("x".into())).status_code(),
			500
		);
	}
}
