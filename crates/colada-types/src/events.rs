//! Event types for mutation notifications.
//!
//! Every order mutation publishes one of these on the engine's event bus.
//! The notification dispatch worker reacts to them by pushing the current
//! in-progress order list to the broadcast sink, keeping the side effect
//! fully decoupled from the request path.

use serde::{Deserialize, Serialize};

/// A committed order mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VentaEvent {
	/// An order was created.
	Created { venta_id: String },
	/// An order was updated (state transition or field update).
	Updated { venta_id: String },
	/// An order was deleted.
	Deleted { venta_id: String },
}

impl VentaEvent {
	/// The id of the mutated order.
	pub fn venta_id(&self) -> &str {
		match self {
			VentaEvent::Created { venta_id }
			| VentaEvent::Updated { venta_id }
			| VentaEvent::Deleted { venta_id } => venta_id,
		}
	}
}
