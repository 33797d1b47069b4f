// Scripted backend for coordinator tests

use async_trait::async_trait;
use auction_client::{AuctionBackend, ClientError};
use auction_types::api::ListAuctionsQuery;
use auction_types::{Amount, AuctionId, AuctionSnapshot, CarDetails, PlacedBid};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Scripted<T> = Mutex<VecDeque<(Duration, Result<T, ClientError>)>>;

/// Each call pops the next scripted response for its endpoint, waits the
/// scripted delay and returns it. Unscripted listing calls return an empty
/// page; unscripted detail and bid calls fail.
#[derive(Default)]
pub(crate) struct MockBackend {
	listings: Scripted<Vec<AuctionSnapshot>>,
	details: Scripted<AuctionSnapshot>,
	bids: Scripted<Option<AuctionSnapshot>>,
	pub list_calls: AtomicUsize,
	pub detail_calls: AtomicUsize,
	pub bid_calls: AtomicUsize,
}

impl MockBackend {
	pub fn listing(
		self,
		delay: Duration,
		result: Result<Vec<AuctionSnapshot>, ClientError>,
	) -> Self {
		self.listings.lock().unwrap().push_back((delay, result));
		self
	}

	pub fn detail(self, delay: Duration, result: Result<AuctionSnapshot, ClientError>) -> Self {
		self.details.lock().unwrap().push_back((delay, result));
		self
	}

	pub fn bid(
		self,
		delay: Duration,
		result: Result<Option<AuctionSnapshot>, ClientError>,
	) -> Self {
		self.bids.lock().unwrap().push_back((delay, result));
		self
	}

	pub fn calls(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}
}

async fn play<T>(
	script: &Scripted<T>,
	counter: &AtomicUsize,
	fallback: impl FnOnce() -> Result<T, ClientError>,
) -> Result<T, ClientError> {
	counter.fetch_add(1, Ordering::SeqCst);
	let next = script.lock().unwrap().pop_front();
	match next {
		Some((delay, result)) => {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			result
		}
		None => fallback(),
	}
}

#[async_trait]
impl AuctionBackend for MockBackend {
	async fn list_live_auctions(
		&self,
		_: &ListAuctionsQuery,
	) -> Result<Vec<AuctionSnapshot>, ClientError> {
		play(&self.listings, &self.list_calls, || Ok(Vec::new())).await
	}

	async fn get_auction(&self, auction_id: &AuctionId) -> Result<AuctionSnapshot, ClientError> {
		let id = auction_id.clone();
		play(&self.details, &self.detail_calls, move || {
			Err(ClientError::Rejected {
				status: 404,
				message: Some(format!("Auction {} not found", id)),
			})
		})
		.await
	}

	async fn place_bid(
		&self,
		_: &AuctionId,
		_: Amount,
	) -> Result<Option<AuctionSnapshot>, ClientError> {
		play(&self.bids, &self.bid_calls, || {
			Err(ClientError::Network("no scripted bid response".to_string()))
		})
		.await
	}

	async fn get_car_details(&self, _: &str) -> Result<Option<CarDetails>, ClientError> {
		Ok(None)
	}

	async fn placed_bids(&self) -> Result<Vec<PlacedBid>, ClientError> {
		Ok(Vec::new())
	}
}
