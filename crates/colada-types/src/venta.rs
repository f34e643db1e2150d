//! Order ("venta") types for the colada system.
//!
//! This module defines the order record, its fixed lifecycle state
//! enumeration, the cost breakdown, and the state-occupancy history log
//! kept for every order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an order.
///
/// The numbering is canonical and load-bearing: external consumers key on
/// the integer values, and the count-by-status aggregation reports them.
/// Values are serialized as plain integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EstadoVenta {
	/// Something went wrong handling the order.
	Error,
	/// Queued, waiting for a machine. Default initial state and the
	/// in-progress bucket broadcast to connected dashboards.
	EnCola,
	/// Currently being washed.
	Lavando,
	/// Done, awaiting customer pickup.
	PteRecogida,
	/// Picked up. Terminal.
	Recogido,
}

impl EstadoVenta {
	/// The wire value of this state.
	pub fn value(self) -> u8 {
		match self {
			EstadoVenta::Error => 0,
			EstadoVenta::EnCola => 1,
			EstadoVenta::Lavando => 2,
			EstadoVenta::PteRecogida => 3,
			EstadoVenta::Recogido => 4,
		}
	}

	/// Upper-case name as used in logs and operator tooling.
	pub fn as_str(self) -> &'static str {
		match self {
			EstadoVenta::Error => "ERROR",
			EstadoVenta::EnCola => "EN_COLA",
			EstadoVenta::Lavando => "LAVANDO",
			EstadoVenta::PteRecogida => "PTE_RECOGIDA",
			EstadoVenta::Recogido => "RECOGIDO",
		}
	}

	/// Returns an iterator over every state, in wire-value order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Error,
			Self::EnCola,
			Self::Lavando,
			Self::PteRecogida,
			Self::Recogido,
		]
		.into_iter()
	}

	/// True for states after which an order needs no further handling.
	pub fn is_terminal(self) -> bool {
		matches!(self, EstadoVenta::Recogido)
	}

	/// The state whose order list is pushed to the broadcast endpoint.
	pub const IN_PROGRESS: EstadoVenta = EstadoVenta::EnCola;
}

impl fmt::Display for EstadoVenta {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<EstadoVenta> for u8 {
	fn from(estado: EstadoVenta) -> Self {
		estado.value()
	}
}

/// Error produced when a wire value does not name a lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstadoInvalido(pub u8);

impl fmt::Display for EstadoInvalido {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "invalid estado value: {}", self.0)
	}
}

impl std::error::Error for EstadoInvalido {}

impl TryFrom<u8> for EstadoVenta {
	// Named concretely: `Self::Error` would collide with the variant.
	type Error = EstadoInvalido;

	fn try_from(value: u8) -> Result<Self, EstadoInvalido> {
		match value {
			0 => Ok(EstadoVenta::Error),
			1 => Ok(EstadoVenta::EnCola),
			2 => Ok(EstadoVenta::Lavando),
			3 => Ok(EstadoVenta::PteRecogida),
			4 => Ok(EstadoVenta::Recogido),
			other => Err(EstadoInvalido(other)),
		}
	}
}

/// Cost breakdown for an order, in integer currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coste {
	/// Washer cost, when itemized.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lavadora: Option<i64>,
	/// Dryer cost, when itemized.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub secadora: Option<i64>,
	/// Total charged. Always present.
	pub total: i64,
}

/// One occupancy of a lifecycle state.
///
/// `salida` is `None` while the order is still in the state. A state the
/// order re-enters gets a fresh record; earlier occupancies are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcupacionEstado {
	pub estado: EstadoVenta,
	pub entrada: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub salida: Option<DateTime<Utc>>,
}

/// A single laundry-service transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venta {
	/// Document identifier.
	pub id: String,
	/// Owning client's identifier. Resolved server-side, never taken from
	/// the request verbatim.
	pub client_id: String,
	/// Snapshot of the client display name at creation time.
	pub nombre: String,
	/// Current lifecycle state.
	pub estado_actual: EstadoVenta,
	/// Cost breakdown.
	pub coste: Coste,
	/// Append-only audit log of state occupancies, oldest first.
	#[serde(default)]
	pub historial_estados: Vec<OcupacionEstado>,
	/// Server-assigned creation timestamp.
	pub created_at: DateTime<Utc>,
	/// Server-assigned last-modification timestamp.
	pub updated_at: DateTime<Utc>,
}

impl Venta {
	/// Appends an open occupancy record for `estado`.
	pub fn open_occupancy(&mut self, estado: EstadoVenta, at: DateTime<Utc>) {
		self.historial_estados.push(OcupacionEstado {
			estado,
			entrada: at,
			salida: None,
		});
	}

	/// Closes the most recent open occupancy of `estado`, if any.
	///
	/// Silently does nothing when no open occupancy exists for that state;
	/// a missing entry means the state was never opened and there is
	/// nothing to audit.
	pub fn close_open_occupancy(&mut self, estado: EstadoVenta, at: DateTime<Utc>) {
		if let Some(entry) = self
			.historial_estados
			.iter_mut()
			.rev()
			.find(|entry| entry.estado == estado && entry.salida.is_none())
		{
			entry.salida = Some(at);
		}
	}

	/// Returns the most recent occupancy record for `estado`.
	pub fn last_occupancy(&self, estado: EstadoVenta) -> Option<&OcupacionEstado> {
		self.historial_estados
			.iter()
			.rev()
			.find(|entry| entry.estado == estado)
	}
}

/// Masks a display name down to "Firstname L." for public projections.
///
/// A single-word name is passed through unchanged.
pub fn alias_publico(nombre: &str) -> String {
	let mut parts = nombre.split_whitespace();
	let first = parts.next().unwrap_or("");
	match parts.next().and_then(|surname| surname.chars().next()) {
		Some(initial) => format!("{} {}.", first, initial),
		None => first.to_string(),
	}
}

/// Redacted projection of an order for the unauthenticated public endpoint.
///
/// Carries no phone number, no raw display name and no client identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VentaPublica {
	pub id: String,
	pub estado_actual: EstadoVenta,
	pub coste: CostePublico,
	pub updated_at: DateTime<Utc>,
	/// Masked display name, e.g. "Ana L.".
	pub alias: String,
}

/// The only cost field the public projection exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostePublico {
	pub total: i64,
}

impl From<&Venta> for VentaPublica {
	fn from(venta: &Venta) -> Self {
		Self {
			id: venta.id.clone(),
			estado_actual: venta.estado_actual,
			coste: CostePublico {
				total: venta.coste.total,
			},
			updated_at: venta.updated_at,
			alias: alias_publico(&venta.nombre),
		}
	}
}
