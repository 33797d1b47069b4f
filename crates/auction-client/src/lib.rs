//! Backend access for the auction coordinator.
//!
//! The coordinator only ever talks to the backend through
//! [`AuctionBackend`]; [`HttpBackend`] is the REST implementation used in
//! production, and tests substitute their own.

use async_trait::async_trait;
use auction_types::api::ListAuctionsQuery;
use auction_types::{Amount, AuctionError, AuctionId, AuctionSnapshot, CarDetails, PlacedBid};
use thiserror::Error;

pub mod implementations;

pub use implementations::http::HttpBackend;

/// Fallback shown when the backend rejects a request without a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Please try again later";

#[derive(Debug, Error)]
pub enum ClientError {
	/// Transport failure, including timeouts.
	#[error("Network error: {0}")]
	Network(String),

	/// Non-success status. `message` is the backend's own wording, if any.
	#[error("Request rejected with status {status}: {}", .message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
	Rejected { status: u16, message: Option<String> },

	#[error("Invalid response: {0}")]
	InvalidResponse(String),

	#[error(transparent)]
	Payload(#[from] AuctionError),

	#[error("Client configuration error: {0}")]
	Config(String),
}

impl ClientError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::Rejected { status: 404, .. })
	}
}

/// REST operations the coordinator needs from the dealer backend.
#[async_trait]
pub trait AuctionBackend: Send + Sync {
	/// `GET /auction?status=LIVE&...`, normalized. Unusable records are
	/// dropped rather than failing the page.
	async fn list_live_auctions(
		&self,
		query: &ListAuctionsQuery,
	) -> Result<Vec<AuctionSnapshot>, ClientError>;

	/// `GET /auction/{id}`.
	async fn get_auction(&self, auction_id: &AuctionId) -> Result<AuctionSnapshot, ClientError>;

	/// `POST /auction/{id}/bid`. Returns the updated auction when the
	/// backend includes one in the acceptance body.
	async fn place_bid(
		&self,
		auction_id: &AuctionId,
		amount: Amount,
	) -> Result<Option<AuctionSnapshot>, ClientError>;

	/// `GET /car/car-details/{carId}`.
	async fn get_car_details(&self, car_id: &str) -> Result<Option<CarDetails>, ClientError>;

	/// `GET /auction/bid/placed`.
	async fn placed_bids(&self) -> Result<Vec<PlacedBid>, ClientError>;
}
