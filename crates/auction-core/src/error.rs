// auction-core/src/error.rs

use auction_client::{ClientError, GENERIC_FAILURE_MESSAGE};
use auction_types::AuctionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error(transparent)]
	Auction(#[from] AuctionError),

	/// The view that started the operation was unmounted before it
	/// completed; the result was dropped without touching shared state.
	#[error("Result discarded: view '{0}' is no longer mounted")]
	Unmounted(String),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Lifecycle error: {0}")]
	Lifecycle(String),
}

impl CoreError {
	/// The underlying auction error, if this is one.
	pub fn as_auction(&self) -> Option<&AuctionError> {
		match self {
			Self::Auction(e) => Some(e),
			_ => None,
		}
	}

	/// True for client-side validation failures that never reached the backend.
	pub fn is_validation(&self) -> bool {
		self.as_auction().is_some_and(AuctionError::is_validation)
	}
}

/// Maps a failed fetch. Normalization failures keep their own kind, anything
/// else is a network-level failure.
pub(crate) fn fetch_error(err: ClientError) -> AuctionError {
	match err {
		ClientError::Payload(e) => e,
		ClientError::Network(message) => AuctionError::Network(message),
		other => AuctionError::Network(other.to_string()),
	}
}

/// Maps a failed bid submission. A backend rejection carries the backend's
/// message verbatim, or the generic fallback when it sent none.
pub(crate) fn bid_error(err: ClientError) -> AuctionError {
	match err {
		ClientError::Rejected { message, .. } => AuctionError::BidRejected(
			message.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
		),
		ClientError::Payload(e) => e,
		ClientError::Network(message) => AuctionError::Network(message),
		other => AuctionError::Network(other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bid_error_keeps_backend_message() {
		let err = bid_error(ClientError::Rejected {
			status: 400,
			message: Some("Auction has ended".to_string()),
		});
		assert_eq!(err, AuctionError::BidRejected("Auction has ended".to_string()));
		assert_eq!(err.to_string(), "Auction has ended");

		let err = bid_error(ClientError::Rejected {
			status: 500,
			message: None,
		});
		assert_eq!(err.to_string(), GENERIC_FAILURE_MESSAGE);
	}

	#[test]
	fn test_fetch_error_is_network() {
		let err = fetch_error(ClientError::Rejected {
			status: 503,
			message: None,
		});
		assert!(matches!(err, AuctionError::Network(_)));

		let err = fetch_error(ClientError::Network("connection refused".to_string()));
		assert_eq!(err.to_string(), "Network error: connection refused");
	}
}
