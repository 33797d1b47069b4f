//! Per-view countdown timers.
//!
//! [`compute_remaining`] is the pure part: a function of the end time and
//! the current instant. [`Countdown`] owns one ticking task for one auction
//! in one view and publishes the result on a watch channel. A listing with
//! ten cards owns ten countdowns; none of them share a timer.

use crate::clock::Clock;
use crate::event_bus::EventBus;
use crate::lifecycle::ViewScope;
use auction_types::{
	AuctionEvent, AuctionId, CountdownEvent, CountdownState, NavigationEvent, NavigationReason,
	ENDED_TEXT,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;

/// Time left until `end_time`, floored to whole seconds.
pub fn compute_remaining(end_time: DateTime<Utc>, now: DateTime<Utc>) -> CountdownState {
	let diff = (end_time - now).num_seconds();
	if diff <= 0 {
		return CountdownState::ended();
	}

	let remaining_seconds = diff as u64;
	CountdownState {
		remaining_seconds,
		display_text: format_remaining(remaining_seconds),
	}
}

/// `"{d}d HH:MM:SS"` with days, `"HH:MM:SS"` without, `ENDED` at zero.
pub fn format_remaining(seconds: u64) -> String {
	if seconds == 0 {
		return ENDED_TEXT.to_string();
	}

	let days = seconds / SECONDS_PER_DAY;
	let hours = (seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
	let minutes = (seconds % SECONDS_PER_HOUR) / 60;
	let secs = seconds % 60;

	if days > 0 {
		format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, secs)
	} else {
		format!("{:02}:{:02}:{:02}", hours, minutes, secs)
	}
}

/// Turns a stream of countdown observations into a single expiry signal.
///
/// Fires on the first observation with nothing remaining, including the
/// very first one if the auction was already over at mount.
#[derive(Debug, Default)]
pub struct ExpiryLatch {
	fired: bool,
}

impl ExpiryLatch {
	/// Returns `true` exactly once.
	pub fn observe(&mut self, state: &CountdownState) -> bool {
		if state.is_expired() && !self.fired {
			self.fired = true;
			return true;
		}
		false
	}

	pub fn has_fired(&self) -> bool {
		self.fired
	}

	/// Re-arms the latch for a new end time.
	pub fn reset(&mut self) {
		self.fired = false;
	}
}

/// A running countdown for one auction in one view.
///
/// Dropping it cancels the timer. Changing the end time cancels the old
/// timer and starts a fresh one; the old one can no longer publish.
pub struct Countdown {
	auction_id: AuctionId,
	end_time: DateTime<Utc>,
	clock: Arc<dyn Clock>,
	scope: ViewScope,
	/// Set for the auction open in a detail view; expiry is announced here.
	expiry_events: Option<EventBus>,
	state_tx: Arc<watch::Sender<CountdownState>>,
	generation: Arc<AtomicU64>,
	task: JoinHandle<()>,
}

impl Countdown {
	/// Countdown for a listing card. Only the display state is published.
	pub fn start(
		auction_id: AuctionId,
		end_time: DateTime<Utc>,
		clock: Arc<dyn Clock>,
		scope: &ViewScope,
	) -> Self {
		Self::spawn(auction_id, end_time, clock, scope, None)
	}

	/// Countdown for the auction open in a detail view. Reaching zero
	/// publishes one expiry event and one return-to-listing request.
	pub fn start_detail(
		auction_id: AuctionId,
		end_time: DateTime<Utc>,
		clock: Arc<dyn Clock>,
		scope: &ViewScope,
		events: EventBus,
	) -> Self {
		Self::spawn(auction_id, end_time, clock, scope, Some(events))
	}

	fn spawn(
		auction_id: AuctionId,
		end_time: DateTime<Utc>,
		clock: Arc<dyn Clock>,
		scope: &ViewScope,
		expiry_events: Option<EventBus>,
	) -> Self {
		// The first paint already shows the right value
		let initial = compute_remaining(end_time, clock.now());
		let (state_tx, _) = watch::channel(initial);
		let state_tx = Arc::new(state_tx);
		let generation = Arc::new(AtomicU64::new(0));

		let task = tokio::spawn(tick_loop(TickContext {
			auction_id: auction_id.clone(),
			end_time,
			clock: clock.clone(),
			scope: scope.clone(),
			expiry_events: expiry_events.clone(),
			state_tx: state_tx.clone(),
			generation: generation.clone(),
			my_generation: 0,
		}));

		Self {
			auction_id,
			end_time,
			clock,
			scope: scope.clone(),
			expiry_events,
			state_tx,
			generation,
			task,
		}
	}

	pub fn auction_id(&self) -> &AuctionId {
		&self.auction_id
	}

	pub fn end_time(&self) -> DateTime<Utc> {
		self.end_time
	}

	pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
		self.state_tx.subscribe()
	}

	pub fn current(&self) -> CountdownState {
		self.state_tx.borrow().clone()
	}

	/// Restarts the timer against a new end time. A no-op when unchanged.
	pub fn set_end_time(&mut self, end_time: DateTime<Utc>) {
		if end_time == self.end_time {
			return;
		}

		let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.task.abort();
		debug!(
			"Countdown for auction {} moved from {} to {}",
			self.auction_id, self.end_time, end_time
		);
		self.end_time = end_time;
		self.state_tx
			.send_replace(compute_remaining(end_time, self.clock.now()));

		self.task = tokio::spawn(tick_loop(TickContext {
			auction_id: self.auction_id.clone(),
			end_time,
			clock: self.clock.clone(),
			scope: self.scope.clone(),
			expiry_events: self.expiry_events.clone(),
			state_tx: self.state_tx.clone(),
			generation: self.generation.clone(),
			my_generation,
		}));
	}
}

impl Drop for Countdown {
	fn drop(&mut self) {
		self.generation.fetch_add(1, Ordering::SeqCst);
		self.task.abort();
	}
}

struct TickContext {
	auction_id: AuctionId,
	end_time: DateTime<Utc>,
	clock: Arc<dyn Clock>,
	scope: ViewScope,
	expiry_events: Option<EventBus>,
	state_tx: Arc<watch::Sender<CountdownState>>,
	generation: Arc<AtomicU64>,
	my_generation: u64,
}

impl TickContext {
	fn is_current(&self) -> bool {
		self.generation.load(Ordering::SeqCst) == self.my_generation && self.scope.is_mounted()
	}
}

async fn tick_loop(ctx: TickContext) {
	let mut ticker = tokio::time::interval(TICK_INTERVAL);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	let mut unmount_rx = ctx.scope.subscribe_unmount();
	let mut latch = ExpiryLatch::default();

	loop {
		if !ctx.is_current() {
			break;
		}

		tokio::select! {
			_ = ticker.tick() => {}
			_ = unmount_rx.recv() => break,
		}

		let state = compute_remaining(ctx.end_time, ctx.clock.now());

		// Superseded timers must not publish, so the check sits inside the
		// channel's write
		let mut current = true;
		ctx.state_tx.send_if_modified(|published| {
			if !ctx.is_current() {
				current = false;
				return false;
			}
			if *published == state {
				return false;
			}
			*published = state.clone();
			true
		});
		if !current {
			break;
		}

		if latch.observe(&state) {
			if let Some(events) = ctx.expiry_events.as_ref().filter(|_| ctx.is_current()) {
				info!("Auction {} expired while in view", ctx.auction_id);
				events
					.publish(AuctionEvent::Countdown(CountdownEvent::Expired {
						auction_id: ctx.auction_id.clone(),
					}))
					.ok();
				events
					.publish(AuctionEvent::Navigation(NavigationEvent::ReturnToListing {
						auction_id: ctx.auction_id.clone(),
						reason: NavigationReason::Expired,
					}))
					.ok();
			}
			// Nothing left to count for this end time
			break;
		}
	}

	debug!("Countdown for auction {} stopped", ctx.auction_id);
}
