//! Events published by the coordinator to whatever view is listening.

use crate::common::{Amount, AuctionId, Sequence};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuctionEvent {
	Fetch(FetchEvent),
	Countdown(CountdownEvent),
	Bid(BidEvent),
	Navigation(NavigationEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchEvent {
	ListingReplaced {
		sequence: Sequence,
		count: usize,
	},
	DetailApplied {
		sequence: Sequence,
		auction_id: AuctionId,
	},
	StaleResponseDiscarded {
		sequence: Sequence,
		latest_applied: Sequence,
	},
	/// Non-blocking banner; the existing collection is left in place.
	FetchFailed {
		message: String,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CountdownEvent {
	/// One-shot signal for the auction being viewed in detail.
	Expired { auction_id: AuctionId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BidEvent {
	Accepted {
		auction_id: AuctionId,
		amount: Amount,
	},
	Rejected {
		auction_id: AuctionId,
		message: String,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavigationEvent {
	/// Leave the detail view and return to the listing.
	ReturnToListing {
		auction_id: AuctionId,
		reason: NavigationReason,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationReason {
	/// The local countdown reached zero.
	Expired,
	/// The server reported the auction ended, or its end time had passed.
	Ended,
	/// A bid was accepted and the caller asked to return afterwards.
	BidAccepted,
}
