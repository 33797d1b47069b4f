//! Error types shared across the coordinator crates.

use crate::common::{Amount, AuctionId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuctionError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
	/// Transport failure or timeout talking to the backend.
	#[error("Network error: {0}")]
	Network(String),

	#[error("Invalid bid amount: {0}")]
	InvalidAmount(String),

	#[error("Bid of {amount} must exceed the current bid of {floor}")]
	BelowFloor { amount: Amount, floor: Amount },

	#[error("Auction {0} has expired")]
	AuctionExpired(AuctionId),

	#[error("A bid on auction {0} is already being submitted")]
	SubmissionInProgress(AuctionId),

	#[error("Auction {0} is not tracked locally")]
	UnknownAuction(AuctionId),

	/// Server-declared rejection; the message is shown to the user verbatim.
	#[error("{0}")]
	BidRejected(String),

	#[error("Auction {0} is no longer biddable")]
	StaleAuction(AuctionId),

	#[error("Invalid payload: {0}")]
	InvalidPayload(String),
}

impl AuctionError {
	/// Errors raised before any request leaves the process.
	pub fn is_validation(&self) -> bool {
		matches!(
			self,
			Self::InvalidAmount(_)
				| Self::BelowFloor { .. }
				| Self::AuctionExpired(_)
				| Self::SubmissionInProgress(_)
				| Self::UnknownAuction(_)
		)
	}
}
