//! Order lifecycle management.
//!
//! Creates orders, advances them through the lifecycle state machine while
//! maintaining the per-state occupancy history, and answers the aggregate
//! queries the dashboard endpoints serve. Every committed mutation is
//! published on the event bus so the notification dispatcher can react.

use crate::{event_bus::EventBus, EngineError};
use chrono::{Local, Utc};
use colada_storage::{StorageError, StorageService};
use colada_types::{
	Collection, Coste, DailyStatsResponse, EstadoVenta, UpdateVentaRequest, Venta, VentaEvent,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Order lifecycle manager over the `ventas` collection.
pub struct VentaService {
	storage: Arc<StorageService>,
	events: EventBus,
}

impl VentaService {
	/// Creates a new service over the given store and event bus.
	pub fn new(storage: Arc<StorageService>, events: EventBus) -> Self {
		Self { storage, events }
	}

	/// Persists a new order and seeds its state history.
	///
	/// The history starts with a single open occupancy of the initial
	/// state. `created_at` and `updated_at` are both set to now.
	pub async fn create(
		&self,
		client_id: String,
		nombre: String,
		coste: Coste,
		estado_inicial: EstadoVenta,
	) -> Result<Venta, EngineError> {
		let now = Utc::now();
		let mut venta = Venta {
			id: uuid::Uuid::new_v4().to_string(),
			client_id,
			nombre,
			estado_actual: estado_inicial,
			coste,
			historial_estados: Vec::new(),
			created_at: now,
			updated_at: now,
		};
		venta.open_occupancy(estado_inicial, now);

		self.storage
			.store(Collection::Ventas.as_str(), &venta.id, &venta)
			.await?;

		tracing::info!(
			venta_id = %venta.id,
			estado = %venta.estado_actual,
			"Order created"
		);
		self.events
			.publish(VentaEvent::Created {
				venta_id: venta.id.clone(),
			})
			.ok();

		Ok(venta)
	}

	/// Retrieves an order by id.
	pub async fn get(&self, id: &str) -> Result<Venta, EngineError> {
		self.storage
			.retrieve(Collection::Ventas.as_str(), id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => EngineError::NotFound(format!("venta {} not found", id)),
				other => other.into(),
			})
	}

	/// Returns all orders, optionally filtered to one client.
	pub async fn list(&self, client_id: Option<&str>) -> Result<Vec<Venta>, EngineError> {
		let ventas = self
			.storage
			.filter::<Venta, _>(Collection::Ventas.as_str(), |v| match client_id {
				Some(client_id) => v.client_id == client_id,
				None => true,
			})
			.await?;
		Ok(ventas.into_iter().map(|(_, venta)| venta).collect())
	}

	/// Applies a partial update, advancing the state machine when the
	/// state changes.
	///
	/// A state change closes the latest open occupancy of the outgoing
	/// state (silently skipped when none is open) and appends an open
	/// occupancy of the incoming state. Other supplied fields are applied
	/// verbatim; omitted fields are untouched. The read-modify-write is
	/// not atomic: concurrent transitions on the same order race and the
	/// last write wins.
	pub async fn update(&self, id: &str, request: UpdateVentaRequest) -> Result<Venta, EngineError> {
		let mut venta = self.get(id).await?;
		let now = Utc::now();

		if let Some(nuevo_estado) = request.estado_actual {
			if nuevo_estado != venta.estado_actual {
				venta.close_open_occupancy(venta.estado_actual, now);
				venta.open_occupancy(nuevo_estado, now);
				tracing::info!(
					venta_id = %venta.id,
					from = %venta.estado_actual,
					to = %nuevo_estado,
					"Order state transition"
				);
				venta.estado_actual = nuevo_estado;
			}
		}
		if let Some(nombre) = request.nombre {
			venta.nombre = nombre;
		}
		if let Some(coste) = request.coste {
			venta.coste = coste;
		}
		venta.updated_at = now;

		self.storage
			.update(Collection::Ventas.as_str(), id, &venta)
			.await?;

		self.events
			.publish(VentaEvent::Updated {
				venta_id: venta.id.clone(),
			})
			.ok();

		Ok(venta)
	}

	/// Hard-deletes an order.
	pub async fn delete(&self, id: &str) -> Result<(), EngineError> {
		if !self.storage.exists(Collection::Ventas.as_str(), id).await? {
			return Err(EngineError::NotFound(format!("venta {} not found", id)));
		}
		self.storage.remove(Collection::Ventas.as_str(), id).await?;

		tracing::info!(venta_id = %id, "Order deleted");
		self.events
			.publish(VentaEvent::Deleted {
				venta_id: id.to_string(),
			})
			.ok();

		Ok(())
	}

	/// Counts orders grouped by lifecycle state.
	///
	/// Every enumerated state is present in the result, zero-count states
	/// included; keys are the wire values as strings.
	pub async fn count_by_estado(&self) -> Result<BTreeMap<String, u64>, EngineError> {
		let mut counts: BTreeMap<String, u64> = EstadoVenta::all()
			.map(|estado| (estado.value().to_string(), 0))
			.collect();

		for venta in self.list(None).await? {
			if let Some(count) = counts.get_mut(&venta.estado_actual.value().to_string()) {
				*count += 1;
			}
		}

		Ok(counts)
	}

	/// Computes the daily dashboard aggregates.
	///
	/// "Today" is the local calendar day. Orders created today contribute
	/// to the count and revenue; older orders still in a non-terminal
	/// state count toward the backlog.
	pub async fn daily_stats(&self) -> Result<DailyStatsResponse, EngineError> {
		let today = Local::now().date_naive();

		let mut stats = DailyStatsResponse {
			ventas_hoy: 0,
			ingresos_hoy: 0,
			pendientes_antiguos: 0,
		};

		for venta in self.list(None).await? {
			let created = venta.created_at.with_timezone(&Local).date_naive();
			if created == today {
				stats.ventas_hoy += 1;
				stats.ingresos_hoy += venta.coste.total;
			} else if created < today && !venta.estado_actual.is_terminal() {
				stats.pendientes_antiguos += 1;
			}
		}

		Ok(stats)
	}

	/// Returns the orders currently in the in-progress state.
	///
	/// This list is what the notification dispatcher broadcasts after
	/// every mutation.
	pub async fn in_progress(&self) -> Result<Vec<Venta>, EngineError> {
		let ventas = self
			.storage
			.filter::<Venta, _>(Collection::Ventas.as_str(), |v| {
				v.estado_actual == EstadoVenta::IN_PROGRESS
			})
			.await?;
		Ok(ventas.into_iter().map(|(_, venta)| venta).collect())
	}
}
