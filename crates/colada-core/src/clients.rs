//! Client directory: CRUD and per-client order statistics.

use crate::EngineError;
use chrono::{DateTime, Utc};
use colada_storage::{StorageError, StorageService};
use colada_types::{
	Client, ClientStatsResponse, Collection, CreateClientRequest, UpdateClientRequest, Venta,
};
use std::sync::Arc;

/// CRUD operations over the `clients` collection.
pub struct ClientDirectory {
	storage: Arc<StorageService>,
}

impl ClientDirectory {
	/// Creates a new directory over the given store.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Creates a client owned by the calling subject.
	///
	/// The subject identifier doubles as the document id. Rejected with a
	/// conflict when the subject already owns a record or the phone number
	/// is already on file.
	pub async fn create(
		&self,
		subject: &str,
		request: CreateClientRequest,
	) -> Result<Client, EngineError> {
		let already_claimed = self
			.storage
			.find::<Client, _>(Collection::Clients.as_str(), |c| c.is_claimed_by(subject))
			.await?;
		if already_claimed.is_some() {
			return Err(EngineError::Conflict(
				"a client already exists for this subject".to_string(),
			));
		}

		if let Some(ref telefono) = request.telefono {
			let phone_taken = self
				.storage
				.find::<Client, _>(Collection::Clients.as_str(), |c| {
					c.telefono.as_deref() == Some(telefono)
				})
				.await?;
			if phone_taken.is_some() {
				return Err(EngineError::Conflict(
					"a client with this telefono already exists".to_string(),
				));
			}
		}

		let now = Utc::now();
		let client = Client {
			id: subject.to_string(),
			nombre: request.nombre,
			telefono: request.telefono,
			firebase_uid: Some(subject.to_string()),
			admin: false,
			created_at: now,
			updated_at: now,
		};
		self.storage
			.store(Collection::Clients.as_str(), &client.id, &client)
			.await?;

		tracing::info!(client_id = %client.id, "Client created");
		Ok(client)
	}

	/// Retrieves a client by id.
	pub async fn get(&self, id: &str) -> Result<Client, EngineError> {
		self.storage
			.retrieve(Collection::Clients.as_str(), id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					EngineError::NotFound(format!("client {} not found", id))
				},
				other => other.into(),
			})
	}

	/// Returns all clients.
	pub async fn list(&self) -> Result<Vec<Client>, EngineError> {
		let clients = self
			.storage
			.list::<Client>(Collection::Clients.as_str())
			.await?;
		Ok(clients.into_iter().map(|(_, client)| client).collect())
	}

	/// Applies a partial update to a client.
	///
	/// The `admin` flag is only applied when `allow_admin_change` is set
	/// (the caller is an admin). The claim itself is not updatable here.
	pub async fn update(
		&self,
		id: &str,
		request: UpdateClientRequest,
		allow_admin_change: bool,
	) -> Result<Client, EngineError> {
		let mut client = self.get(id).await?;

		if let Some(nombre) = request.nombre {
			client.nombre = nombre;
		}
		if let Some(telefono) = request.telefono {
			client.telefono = Some(telefono);
		}
		if let Some(admin) = request.admin {
			if allow_admin_change {
				client.admin = admin;
			}
		}
		client.updated_at = Utc::now();

		self.storage
			.update(Collection::Clients.as_str(), id, &client)
			.await?;
		Ok(client)
	}

	/// Deletes a client.
	pub async fn delete(&self, id: &str) -> Result<(), EngineError> {
		if !self.storage.exists(Collection::Clients.as_str(), id).await? {
			return Err(EngineError::NotFound(format!("client {} not found", id)));
		}
		self.storage
			.remove(Collection::Clients.as_str(), id)
			.await?;
		tracing::info!(client_id = %id, "Client deleted");
		Ok(())
	}

	/// Aggregates order count and last purchase date for a client.
	pub async fn stats(&self, id: &str) -> Result<ClientStatsResponse, EngineError> {
		let client = self.get(id).await?;

		let ventas = self
			.storage
			.filter::<Venta, _>(Collection::Ventas.as_str(), |v| v.client_id == client.id)
			.await?;

		let last_purchase_date: Option<DateTime<Utc>> =
			ventas.iter().map(|(_, v)| v.created_at).max();

		Ok(ClientStatsResponse {
			client_id: client.id,
			total_ventas: ventas.len() as u64,
			last_purchase_date,
		})
	}
}
