//! Event bus for mutation notifications.
//!
//! Order mutations are published here and consumed by the notification
//! dispatch worker. The bus is a thin wrapper around a tokio broadcast
//! channel: publishing never blocks the request path, and a slow consumer
//! only ever loses intermediate events, which is acceptable because every
//! dispatch re-reads the current in-progress list anyway.

use colada_types::VentaEvent;
use tokio::sync::broadcast;

/// Broadcast channel for [`VentaEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<VentaEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all subscribers.
	///
	/// Returns Err when no subscriber is listening; callers treat that as
	/// harmless (the dispatcher may not be running in tests).
	pub fn publish(
		&self,
		event: VentaEvent,
	) -> Result<usize, broadcast::error::SendError<VentaEvent>> {
		self.sender.send(event)
	}

	/// Subscribes to the event stream.
	pub fn subscribe(&self) -> broadcast::Receiver<VentaEvent> {
		self.sender.subscribe()
	}
}
