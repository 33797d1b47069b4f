//! Normalized auction model.
//!
//! These types are always fully populated. Defaults for missing backend
//! fields are applied once, in [`crate::api`], never at the point of use.

use crate::common::{Amount, AuctionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-declared auction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionStatus {
	Live,
	Ended,
}

impl fmt::Display for AuctionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Live => write!(f, "LIVE"),
			Self::Ended => write!(f, "ENDED"),
		}
	}
}

/// One auction's state as last known from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionSnapshot {
	pub auction_id: AuctionId,
	pub end_time: DateTime<Utc>,
	pub status: AuctionStatus,
	pub starting_bid: Amount,
	pub current_bid: Amount,
	pub highest_bid: Amount,
	pub bid_count: u64,
	pub cover_image: String,
	pub car: CarSummary,
	pub bid_history: Vec<BidHistoryEntry>,
}

impl AuctionSnapshot {
	/// The amount a new bid must strictly exceed.
	pub fn floor(&self) -> Amount {
		self.current_bid
	}

	/// True when the server declared the auction ended or its end time has
	/// passed at `now`. The server status wins when it says ended.
	pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
		self.status == AuctionStatus::Ended || now >= self.end_time
	}

	/// Applies a bid the backend has accepted.
	pub fn with_accepted_bid(&self, amount: Amount) -> Self {
		let mut next = self.clone();
		next.current_bid = amount;
		next.highest_bid = next.highest_bid.max(amount);
		next.bid_count += 1;
		next
	}

	/// Display title in the `year make model` form used by the listing.
	pub fn title(&self) -> String {
		format!("{} {} {}", self.car.year, self.car.make, self.car.model)
	}
}

/// Vehicle summary embedded in an auction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSummary {
	pub car_id: Option<String>,
	pub make: String,
	pub model: String,
	pub year: i32,
	pub mileage: u64,
	pub condition: String,
	pub vin: String,
	pub engine: String,
	pub transmission: String,
	pub location: String,
	pub color: String,
	pub fuel_type: String,
	pub drivetrain: String,
	pub body_type: String,
	pub doors: u32,
	pub seats: u32,
	pub features: Vec<String>,
	pub inspection_report: InspectionReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
	pub exterior: String,
	pub interior: String,
	pub mechanical: String,
	pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidHistoryEntry {
	pub amount: Amount,
	pub bidder: String,
	pub timestamp: DateTime<Utc>,
}

/// Full vehicle record returned by the car details endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarDetails {
	pub summary: CarSummary,
	pub images: Vec<String>,
	/// First inspection's free-form payload, if the car has been inspected.
	pub inspection: Option<serde_json::Value>,
}

/// Status of one of the dealer's own bids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacedBidStatus {
	Pending,
	Accepted,
	Rejected,
	Won,
	Other(String),
}

impl fmt::Display for PlacedBidStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pending => write!(f, "pending"),
			Self::Accepted => write!(f, "accepted"),
			Self::Rejected => write!(f, "rejected"),
			Self::Won => write!(f, "won"),
			Self::Other(s) => write!(f, "{}", s),
		}
	}
}

/// One entry of the dealer's bid history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBid {
	pub bid_id: String,
	pub auction_id: Option<AuctionId>,
	pub amount: Amount,
	pub status: PlacedBidStatus,
	pub placed_at: Option<DateTime<Utc>>,
}
