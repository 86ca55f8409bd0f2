//! Event bus for monitor outcomes.
//!
//! Terminal outcomes surface long after the originating request returned,
//! so they are broadcast here for whoever wants them: logs today, any
//! notification channel later.

use relayer_types::MonitorEvent;
use tokio::sync::broadcast;

/// Event bus for broadcasting monitor events to multiple subscribers.
///
/// Cloning an EventBus creates a new handle to the same underlying
/// broadcast channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// Slow subscribers lose the oldest events once `capacity` is exceeded.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Fails only when nobody is subscribed, which is not an error for the
	/// monitor.
	pub fn publish(
		&self,
		event: MonitorEvent,
	) -> Result<(), broadcast::error::SendError<MonitorEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, TxHash};
	use relayer_types::AttemptOutcome;
	use uuid::Uuid;

	fn event(poll_id: u64) -> MonitorEvent {
		MonitorEvent {
			attempt_id: Uuid::new_v4(),
			poll_id,
			voter: Address::repeat_byte(0x11),
			nonce: 0,
			outcome: AttemptOutcome::Reverted {
				tx_hash: TxHash::repeat_byte(0x01),
				via_replacement: false,
			},
		}
	}

	#[test]
	fn test_publish_with_no_subscribers() {
		let event_bus = EventBus::new(10);
		assert!(event_bus.publish(event(1)).is_err());
	}

	#[tokio::test]
	async fn test_cloned_bus_reaches_all_subscribers() {
		let bus1 = EventBus::new(10);
		let bus2 = bus1.clone();
		let mut receiver1 = bus1.subscribe();
		let mut receiver2 = bus2.subscribe();

		bus2.publish(event(7)).unwrap();

		assert_eq!(receiver1.recv().await.unwrap().poll_id, 7);
		assert_eq!(receiver2.recv().await.unwrap().poll_id, 7);
	}

	#[tokio::test]
	async fn test_late_subscriber_misses_previous_events() {
		let bus = EventBus::new(10);
		let mut early = bus.subscribe();
		bus.publish(event(1)).unwrap();

		let mut late = bus.subscribe();
		bus.publish(event(2)).unwrap();

		assert_eq!(early.recv().await.unwrap().poll_id, 1);
		assert_eq!(early.recv().await.unwrap().poll_id, 2);
		assert_eq!(late.recv().await.unwrap().poll_id, 2);
	}
}
