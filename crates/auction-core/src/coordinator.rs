// auction-core/src/coordinator.rs

use crate::bidding::BidCoordinator;
use crate::book::AuctionBook;
use crate::clock::{Clock, SystemClock};
use crate::countdown::Countdown;
use crate::error::CoreError;
use crate::event_bus::EventBus;
use crate::fetcher::AuctionFetcher;
use crate::lifecycle::ViewScope;
use auction_client::{AuctionBackend, HttpBackend};
use auction_config::AuctionConfig;
use auction_types::{AuctionEvent, AuctionId, AuctionSnapshot, CountdownState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Wires the book, fetcher, bid coordinator and event bus together.
pub struct AuctionCoordinator {
	config: AuctionConfig,
	book: Arc<AuctionBook>,
	events: EventBus,
	clock: Arc<dyn Clock>,
	fetcher: Arc<AuctionFetcher>,
	bids: BidCoordinator,
}

impl AuctionCoordinator {
	pub fn config(&self) -> &AuctionConfig {
		&self.config
	}

	pub fn book(&self) -> &Arc<AuctionBook> {
		&self.book
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
		self.events.subscribe()
	}

	pub fn fetcher(&self) -> &Arc<AuctionFetcher> {
		&self.fetcher
	}

	pub fn bids(&self) -> &BidCoordinator {
		&self.bids
	}

	pub fn clock(&self) -> Arc<dyn Clock> {
		self.clock.clone()
	}

	/// Mounts the listing: initial fetch, polling, one countdown per card.
	///
	/// A failed initial fetch is reported on the bus and does not prevent
	/// the view from opening; the next poll retries.
	pub async fn open_listing(&self) -> Result<ListingView, CoreError> {
		let scope = ViewScope::mount("listing");

		if let Err(e) = self.fetcher.fetch_live_auctions(&scope).await {
			warn!("Initial listing fetch failed: {}", e);
		}
		let poller = self.fetcher.start_polling(&scope);

		let mut view = ListingView {
			scope,
			poller,
			clock: self.clock.clone(),
			countdowns: HashMap::new(),
		};
		view.sync(&self.book);
		Ok(view)
	}

	/// Mounts the detail view for one auction.
	///
	/// Fails with `StaleAuction` (after publishing the navigation event) when
	/// the auction is no longer biddable.
	pub async fn open_detail(&self, auction_id: &AuctionId) -> Result<DetailView, CoreError> {
		let scope = ViewScope::mount(format!("detail:{}", auction_id));

		let snapshot = match self.fetcher.fetch_auction_detail(auction_id, &scope).await {
			Ok(snapshot) => snapshot,
			Err(e) => {
				scope.unmount().ok();
				return Err(e);
			}
		};

		let countdown = Countdown::start_detail(
			auction_id.clone(),
			snapshot.end_time,
			self.clock.clone(),
			&scope,
			self.events.clone(),
		);
		info!(
			"Opened auction {} ({}), {} left",
			auction_id,
			snapshot.title(),
			countdown.current().display_text
		);

		Ok(DetailView {
			scope,
			snapshot,
			countdown,
		})
	}
}

/// A mounted listing view.
pub struct ListingView {
	scope: ViewScope,
	poller: JoinHandle<()>,
	clock: Arc<dyn Clock>,
	countdowns: HashMap<AuctionId, Countdown>,
}

impl ListingView {
	pub fn scope(&self) -> &ViewScope {
		&self.scope
	}

	/// Aligns the per-card countdowns with the book: new cards get a timer,
	/// removed cards drop theirs, moved end times restart theirs.
	pub fn sync(&mut self, book: &AuctionBook) {
		let snapshots = book.snapshots();
		self.countdowns
			.retain(|id, _| snapshots.iter().any(|s| &s.auction_id == id));

		for snapshot in &snapshots {
			match self.countdowns.get_mut(&snapshot.auction_id) {
				Some(countdown) => countdown.set_end_time(snapshot.end_time),
				None => {
					let countdown = Countdown::start(
						snapshot.auction_id.clone(),
						snapshot.end_time,
						self.clock.clone(),
						&self.scope,
					);
					self.countdowns
						.insert(snapshot.auction_id.clone(), countdown);
				}
			}
		}
		debug!("Listing tracks {} countdowns", self.countdowns.len());
	}

	pub fn countdown(&self, auction_id: &AuctionId) -> Option<CountdownState> {
		self.countdowns.get(auction_id).map(Countdown::current)
	}

	pub fn len(&self) -> usize {
		self.countdowns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.countdowns.is_empty()
	}

	/// Unmounts the view and waits for its polling loop to finish.
	pub async fn close(self) -> Result<(), CoreError> {
		self.scope.unmount()?;
		self.poller
			.await
			.map_err(|e| CoreError::Lifecycle(format!("Polling task failed: {}", e)))
	}
}

/// A mounted detail view.
pub struct DetailView {
	pub scope: ViewScope,
	pub snapshot: AuctionSnapshot,
	pub countdown: Countdown,
}

impl DetailView {
	pub fn auction_id(&self) -> &AuctionId {
		&self.snapshot.auction_id
	}

	/// Takes a newer snapshot; the countdown restarts if the end time moved.
	pub fn refresh(&mut self, snapshot: AuctionSnapshot) {
		self.countdown.set_end_time(snapshot.end_time);
		self.snapshot = snapshot;
	}

	pub fn close(self) -> Result<(), CoreError> {
		self.scope.unmount()
	}
}

/// Builds an [`AuctionCoordinator`], defaulting to the HTTP backend and the
/// system clock.
pub struct CoordinatorBuilder {
	config: AuctionConfig,
	backend: Option<Arc<dyn AuctionBackend>>,
	clock: Option<Arc<dyn Clock>>,
}

impl CoordinatorBuilder {
	pub fn new(config: AuctionConfig) -> Self {
		Self {
			config,
			backend: None,
			clock: None,
		}
	}

	pub fn with_backend(mut self, backend: Arc<dyn AuctionBackend>) -> Self {
		self.backend = Some(backend);
		self
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	pub fn build(self) -> Result<AuctionCoordinator, CoreError> {
		let backend = match self.backend {
			Some(backend) => backend,
			None => Arc::new(
				HttpBackend::new(&self.config.backend)
					.map_err(|e| CoreError::Configuration(e.to_string()))?,
			),
		};
		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

		let book = Arc::new(AuctionBook::new());
		let events = EventBus::new(self.config.events.capacity);
		let fetcher = Arc::new(AuctionFetcher::new(
			backend.clone(),
			book.clone(),
			events.clone(),
			clock.clone(),
			&self.config,
		));
		let bids = BidCoordinator::new(
			backend,
			book.clone(),
			events.clone(),
			clock.clone(),
			&self.config,
		);

		Ok(AuctionCoordinator {
			config: self.config,
			book,
			events,
			clock,
			fetcher,
			bids,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::book::tests::snapshot;
	use crate::mock::MockBackend;
	use auction_types::{AuctionError, AuctionStatus, NavigationEvent, NavigationReason};
	use chrono::{Duration as ChronoDuration, Utc};
	use std::time::Duration;

	fn coordinator(backend: MockBackend) -> AuctionCoordinator {
		let mut config = AuctionConfig::default();
		config.polling.jitter_ms = 0;
		CoordinatorBuilder::new(config)
			.with_backend(Arc::new(backend))
			.build()
			.unwrap()
	}

	#[tokio::test]
	async fn test_listing_view_tracks_a_countdown_per_card() {
		tokio::time::pause();
		let mut moved = snapshot("2", 100_000, 0);
		moved.end_time = Utc::now() + ChronoDuration::days(2);

		let coordinator = coordinator(
			MockBackend::default()
				.listing(
					Duration::ZERO,
					Ok(vec![snapshot("1", 100_000, 0), snapshot("2", 100_000, 0)]),
				)
				.listing(Duration::ZERO, Ok(vec![moved])),
		);

		let mut view = coordinator.open_listing().await.unwrap();
		assert_eq!(view.len(), 2);
		assert!(view.countdown(&AuctionId::from("1")).is_some());

		// First poll drops card 1 and moves card 2's end time
		tokio::time::sleep(Duration::from_secs(31)).await;
		view.sync(coordinator.book());
		assert_eq!(view.len(), 1);
		assert!(view.countdown(&AuctionId::from("1")).is_none());
		assert!(view
			.countdown(&AuctionId::from("2"))
			.unwrap()
			.display_text
			.starts_with("1d "));

		view.close().await.unwrap();
	}

	#[tokio::test]
	async fn test_listing_opens_even_when_first_fetch_fails() {
		tokio::time::pause();
		let coordinator = coordinator(MockBackend::default().listing(
			Duration::ZERO,
			Err(auction_client::ClientError::Network("offline".to_string())),
		));

		let view = coordinator.open_listing().await.unwrap();
		assert!(view.is_empty());
		view.close().await.unwrap();
	}

	#[tokio::test]
	async fn test_detail_view_for_ended_auction_is_refused() {
		let mut ended = snapshot("3", 100_000, 0);
		ended.status = AuctionStatus::Ended;
		let coordinator = coordinator(MockBackend::default().detail(Duration::ZERO, Ok(ended)));
		let mut rx = coordinator.subscribe();

		let err = coordinator
			.open_detail(&AuctionId::from("3"))
			.await
			.err()
			.unwrap();
		assert_eq!(
			err.as_auction(),
			Some(&AuctionError::StaleAuction(AuctionId::from("3")))
		);
		assert_eq!(
			rx.recv().await.unwrap(),
			AuctionEvent::Navigation(NavigationEvent::ReturnToListing {
				auction_id: AuctionId::from("3"),
				reason: NavigationReason::Ended,
			})
		);
	}

	#[tokio::test]
	async fn test_detail_view_counts_down_and_bids() {
		let coordinator = coordinator(
			MockBackend::default()
				.detail(Duration::ZERO, Ok(snapshot("4", 120_000, 1)))
				.bid(Duration::ZERO, Ok(None)),
		);

		let view = coordinator.open_detail(&AuctionId::from("4")).await.unwrap();
		assert!(!view.countdown.current().is_expired());

		let receipt = coordinator
			.bids()
			.submit_bid(view.auction_id(), "125,000", &view.scope)
			.await
			.unwrap();
		assert_eq!(receipt.attempt.amount, 125_000);
		assert_eq!(
			coordinator.book().get(view.auction_id()).unwrap().current_bid,
			125_000
		);
		view.close().unwrap();
	}

	#[tokio::test]
	async fn test_detail_refresh_follows_newer_snapshot() {
		let mut extended = snapshot("8", 130_000, 2);
		extended.end_time = Utc::now() + ChronoDuration::days(3);
		let coordinator = coordinator(
			MockBackend::default()
				.detail(Duration::ZERO, Ok(snapshot("8", 120_000, 1)))
				.detail(Duration::ZERO, Ok(extended.clone())),
		);

		let mut view = coordinator.open_detail(&AuctionId::from("8")).await.unwrap();
		assert!(!view.countdown.current().display_text.contains('d'));

		let newer = coordinator
			.fetcher()
			.fetch_auction_detail(view.auction_id(), &view.scope)
			.await
			.unwrap();
		view.refresh(newer);

		assert_eq!(view.snapshot.current_bid, 130_000);
		assert_eq!(view.countdown.end_time(), extended.end_time);
		assert!(view.countdown.current().display_text.starts_with("2d "));
		view.close().unwrap();
	}
}
