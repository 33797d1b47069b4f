//! Auction snapshot fetching and listing polls.

use crate::book::{ApplyOutcome, AuctionBook};
use crate::clock::Clock;
use crate::error::{fetch_error, CoreError};
use crate::event_bus::EventBus;
use crate::lifecycle::ViewScope;
use crate::utils::{jittered, with_timeout};
use auction_client::AuctionBackend;
use auction_config::{AuctionConfig, PollPolicy, PollingConfig};
use auction_types::api::ListAuctionsQuery;
use auction_types::{
	AuctionError, AuctionEvent, AuctionId, AuctionSnapshot, CarDetails, FetchEvent,
	NavigationEvent, NavigationReason, PlacedBid,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Keeps the auction book fresh.
///
/// Overlapping fetches are allowed. Each one takes a sequence number before
/// its request goes out and the book decides whether the response is still
/// the newest data when it arrives.
pub struct AuctionFetcher {
	backend: Arc<dyn AuctionBackend>,
	book: Arc<AuctionBook>,
	events: EventBus,
	clock: Arc<dyn Clock>,
	query: ListAuctionsQuery,
	polling: PollingConfig,
	request_timeout: Duration,
}

impl AuctionFetcher {
	pub fn new(
		backend: Arc<dyn AuctionBackend>,
		book: Arc<AuctionBook>,
		events: EventBus,
		clock: Arc<dyn Clock>,
		config: &AuctionConfig,
	) -> Self {
		Self {
			backend,
			book,
			events,
			clock,
			query: ListAuctionsQuery::from(&config.listing),
			polling: config.polling.clone(),
			request_timeout: config.backend.request_timeout(),
		}
	}

	/// Fetches the live listing and replaces the book with it.
	///
	/// On failure the book is left exactly as it was and a `FetchFailed`
	/// event is published for the view's banner.
	#[instrument(skip_all, fields(view = scope.name()))]
	pub async fn fetch_live_auctions(&self, scope: &ViewScope) -> Result<ApplyOutcome, CoreError> {
		let sequence = self.book.next_sequence();
		let result = with_timeout(
			self.request_timeout,
			self.backend.list_live_auctions(&self.query),
		)
		.await;

		if !scope.is_mounted() {
			return Err(scope.discarded());
		}

		let snapshots = match result {
			Ok(snapshots) => snapshots,
			Err(e) => {
				let err = fetch_error(e);
				warn!("Listing fetch #{} failed: {}", sequence, err);
				self.publish(FetchEvent::FetchFailed {
					message: err.to_string(),
				});
				return Err(err.into());
			}
		};

		let count = snapshots.len();
		let outcome = self.book.apply_listing(sequence, snapshots);
		match outcome {
			ApplyOutcome::Applied { sequence } => {
				info!("Listing #{} applied with {} live auctions", sequence, count);
				self.publish(FetchEvent::ListingReplaced { sequence, count });
			}
			ApplyOutcome::Discarded {
				sequence,
				latest_applied,
			} => {
				self.publish(FetchEvent::StaleResponseDiscarded {
					sequence,
					latest_applied,
				});
			}
		}
		Ok(outcome)
	}

	/// Fetches one auction for the detail view.
	///
	/// An auction the server reports as ended, or whose end time has passed,
	/// is not biddable: a return-to-listing event is published and
	/// `StaleAuction` returned instead of detail state.
	#[instrument(skip(self, scope), fields(view = scope.name()))]
	pub async fn fetch_auction_detail(
		&self,
		auction_id: &AuctionId,
		scope: &ViewScope,
	) -> Result<AuctionSnapshot, CoreError> {
		let sequence = self.book.next_sequence();
		let result = with_timeout(self.request_timeout, self.backend.get_auction(auction_id)).await;

		if !scope.is_mounted() {
			return Err(scope.discarded());
		}

		let snapshot = match result {
			Ok(snapshot) => snapshot,
			Err(e) => {
				let err = fetch_error(e);
				warn!("Detail fetch #{} for auction {} failed: {}", sequence, auction_id, err);
				self.publish(FetchEvent::FetchFailed {
					message: err.to_string(),
				});
				return Err(err.into());
			}
		};

		if snapshot.has_ended_at(self.clock.now()) {
			info!(
				"Auction {} is no longer biddable (status {}, ended {})",
				auction_id, snapshot.status, snapshot.end_time
			);
			// Server-declared end wins over the tracked entry
			if !self.book.apply_detail(sequence, snapshot).is_applied() {
				debug!("Ended detail #{} for auction {} was older than the book", sequence, auction_id);
			}
			self.events
				.publish(AuctionEvent::Navigation(NavigationEvent::ReturnToListing {
					auction_id: auction_id.clone(),
					reason: NavigationReason::Ended,
				}))
				.ok();
			return Err(AuctionError::StaleAuction(auction_id.clone()).into());
		}

		match self.book.apply_detail(sequence, snapshot.clone()) {
			ApplyOutcome::Applied { sequence } => {
				debug!("Detail #{} applied for auction {}", sequence, auction_id);
				self.publish(FetchEvent::DetailApplied {
					sequence,
					auction_id: auction_id.clone(),
				});
				Ok(snapshot)
			}
			ApplyOutcome::Discarded {
				sequence,
				latest_applied,
			} => {
				self.publish(FetchEvent::StaleResponseDiscarded {
					sequence,
					latest_applied,
				});
				// The book already holds something newer
				Ok(self.book.get(auction_id).unwrap_or(snapshot))
			}
		}
	}

	/// Vehicle metadata and inspection payload for the detail view.
	#[instrument(skip(self))]
	pub async fn fetch_car_details(&self, car_id: &str) -> Result<Option<CarDetails>, CoreError> {
		with_timeout(self.request_timeout, self.backend.get_car_details(car_id))
			.await
			.map_err(|e| fetch_error(e).into())
	}

	/// The dealer's own bids.
	#[instrument(skip(self))]
	pub async fn fetch_placed_bids(&self) -> Result<Vec<PlacedBid>, CoreError> {
		with_timeout(self.request_timeout, self.backend.placed_bids())
			.await
			.map_err(|e| fetch_error(e).into())
	}

	/// Polls the listing until `scope` unmounts.
	///
	/// Under [`PollPolicy::SuspendWhenEmpty`] ticks are skipped while the
	/// book is empty; a manual fetch that repopulates it resumes polling.
	pub fn start_polling(self: &Arc<Self>, scope: &ViewScope) -> JoinHandle<()> {
		let fetcher = Arc::clone(self);
		let scope = scope.clone();

		tokio::spawn(async move {
			let mut unmount_rx = scope.subscribe_unmount();
			info!(
				"Polling listing every {}s (policy {}) for view '{}'",
				fetcher.polling.interval_secs,
				fetcher.polling.policy,
				scope.name()
			);

			while scope.is_mounted() {
				let delay = jittered(fetcher.polling.interval(), fetcher.polling.jitter());
				tokio::select! {
					_ = tokio::time::sleep(delay) => {}
					_ = unmount_rx.recv() => break,
				}

				if fetcher.polling.policy == PollPolicy::SuspendWhenEmpty && fetcher.book.is_empty()
				{
					debug!("No auctions tracked, skipping poll");
					continue;
				}

				match fetcher.fetch_live_auctions(&scope).await {
					Ok(_) => {}
					Err(CoreError::Unmounted(_)) => break,
					// Already reported on the bus; the next tick retries
					Err(e) => debug!("Poll failed: {}", e),
				}
			}

			debug!("Polling stopped for view '{}'", scope.name());
		})
	}

	fn publish(&self, event: FetchEvent) {
		self.events.publish(AuctionEvent::Fetch(event)).ok();
	}
}
