//! Bid attempt model.

use crate::common::{Amount, AuctionId, Sequence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a bid attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidState {
	/// The user is still editing; nothing has been sent.
	Drafting,
	/// Client-side checks are running.
	Validating,
	/// The request is in flight.
	Submitting,
	Accepted,
	Rejected,
}

impl BidState {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Accepted | Self::Rejected)
	}
}

impl fmt::Display for BidState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Drafting => write!(f, "Drafting"),
			Self::Validating => write!(f, "Validating"),
			Self::Submitting => write!(f, "Submitting"),
			Self::Accepted => write!(f, "Accepted"),
			Self::Rejected => write!(f, "Rejected"),
		}
	}
}

/// A user-initiated candidate bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidAttempt {
	pub attempt_id: Uuid,
	pub auction_id: AuctionId,
	pub amount: Amount,
	pub submitted_at: DateTime<Utc>,
	pub state: BidState,
}

impl BidAttempt {
	pub fn new(auction_id: AuctionId, amount: Amount, submitted_at: DateTime<Utc>) -> Self {
		Self {
			attempt_id: Uuid::new_v4(),
			auction_id,
			amount,
			submitted_at,
			state: BidState::Drafting,
		}
	}

	/// Moves the attempt forward. Returns `false` and leaves the state alone
	/// when the transition is not part of the bid lifecycle.
	pub fn transition(&mut self, next: BidState) -> bool {
		use BidState::*;

		let valid = matches!(
			(self.state, next),
			(Drafting, Validating)
				| (Validating, Drafting)
				| (Validating, Submitting)
				| (Submitting, Accepted)
				| (Submitting, Rejected)
		);
		if valid {
			self.state = next;
		}
		valid
	}
}

/// Result of a bid the backend accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidReceipt {
	pub attempt: BidAttempt,
	/// Sequence stamped on the optimistic book entry.
	pub sequence: Sequence,
}
