//! Broadcast bus carrying coordinator events to the views.
//!
//! Fetch results, expiry signals, bid outcomes and navigation requests all
//! flow through one bus; a view subscribes and reacts to the ones it cares
//! about.

use auction_types::AuctionEvent;
use tokio::sync::broadcast;

/// Event bus for broadcasting auction events to every subscribed view.
pub struct EventBus {
	sender: broadcast::Sender<AuctionEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// Slow subscribers lose the oldest events once `capacity` is exceeded.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Each subscriber receives every event published after it subscribed.
	pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Fails only when nobody is listening, which callers treat as harmless.
	pub fn publish(
		&self,
		event: AuctionEvent,
	) -> Result<(), broadcast::error::SendError<AuctionEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
